use std::borrow::Cow;

use bytemuck::Pod;
use wgpu::BufferUsages;

use crate::graphics::{
    asset::{Accessor, AssetDocument, AssetError, ComponentType, ElementType},
    gpu::buffer::{BufferHandle, BufferStore},
    model::ModelError,
};

/// A bounds-checked view of an accessor's elements inside its backing buffer.
#[derive(Clone, Copy)]
pub struct AccessorView<'a> {
    index: usize,
    accessor: &'a Accessor,
    bytes: &'a [u8],
    stride: usize,
}

impl<'a> AccessorView<'a> {
    /// Resolve accessor `index` down to its bytes.
    ///
    /// Fails if any link of accessor -> view -> buffer is missing,
    /// or if the last element ends outside the view or the buffer.
    pub fn new(document: &'a AssetDocument, index: usize) -> Result<Self, AssetError> {
        let accessor = document.accessor(index)?;
        let view_index = accessor
            .buffer_view
            .ok_or(AssetError::MissingBufferView(index))?;
        let view = document
            .buffer_views
            .get(view_index)
            .ok_or(AssetError::BufferViewNotFound {
                accessor: index,
                view: view_index,
            })?;
        let buffer = document
            .buffers
            .get(view.buffer)
            .ok_or(AssetError::BufferNotFound {
                view: view_index,
                buffer: view.buffer,
            })?;

        let element_size = accessor.element_size();
        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(AssetError::InvalidStride {
                accessor: index,
                stride,
                element_size,
            });
        }

        let available = view
            .byte_offset
            .saturating_add(view.byte_length)
            .min(buffer.len());
        let start = view.byte_offset.checked_add(accessor.byte_offset);
        let length = match accessor.count {
            0 => Some(0),
            count => (count - 1)
                .checked_mul(stride)
                .and_then(|len| len.checked_add(element_size)),
        };
        let end = start.zip(length).and_then(|(start, length)| start.checked_add(length));
        match (start, end) {
            (Some(start), Some(end)) if end <= available => Ok(Self {
                index,
                accessor,
                bytes: &buffer[start..end],
                stride,
            }),
            _ => Err(AssetError::AccessorOutOfBounds {
                accessor: index,
                end: end.unwrap_or(usize::MAX),
                available,
            }),
        }
    }

    /// The accessor index this view was resolved from.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.accessor.count
    }

    pub fn component_type(&self) -> ComponentType {
        self.accessor.component_type
    }

    pub fn element_type(&self) -> ElementType {
        self.accessor.element_type
    }

    /// Iterate over the raw bytes of each element.
    pub fn elements(&self) -> impl Iterator<Item = &'a [u8]> + use<'a> {
        let bytes = self.bytes;
        let stride = self.stride;
        let element_size = self.accessor.element_size();
        (0..self.accessor.count).map(move |i| &bytes[i * stride..i * stride + element_size])
    }

    /// Read every element as a `T`, which must be exactly one element wide.
    pub fn read<T: Pod>(&self) -> Result<Vec<T>, AssetError> {
        let element_size = self.accessor.element_size();
        if size_of::<T>() != element_size {
            return Err(AssetError::ElementSizeMismatch {
                accessor: self.index,
                expected: size_of::<T>(),
                actual: element_size,
            });
        }
        Ok(self.elements().map(bytemuck::pod_read_unaligned).collect())
    }

    /// Read every component of every element, widened to u32.
    ///
    /// 8 and 16 bit types are zero-extended (signed types reinterpreted as unsigned).
    /// 32 bit types are passed through bit for bit.
    pub fn read_widened(&self) -> Vec<u32> {
        let component_size = self.accessor.component_type.size();
        self.elements()
            .flat_map(|element| element.chunks_exact(component_size))
            .map(|component| match component {
                [b] => *b as u32,
                [b0, b1] => u16::from_le_bytes([*b0, *b1]) as u32,
                [b0, b1, b2, b3] => u32::from_le_bytes([*b0, *b1, *b2, *b3]),
                _ => unreachable!("component sizes are 1, 2 or 4 bytes"),
            })
            .collect()
    }

    /// Read a scalar integer accessor as u32 indices.
    pub fn read_indices(&self) -> Result<Vec<u32>, AssetError> {
        if self.accessor.element_type != ElementType::Scalar || self.accessor.component_type.is_float()
        {
            return Err(AssetError::NotAnIndexAccessor(self.index));
        }
        Ok(self.read_widened())
    }

    /// The data to hand to a `BufferStore`: tightly packed, with narrow integers widened to u32.
    pub fn to_upload(&self) -> AccessorUpload<'a> {
        let component_type = self.accessor.component_type;
        let element_type = self.accessor.element_type;

        let mut usage = BufferUsages::STORAGE;
        if component_type.is_float() {
            usage |= BufferUsages::VERTEX;
        } else if element_type == ElementType::Scalar {
            usage |= BufferUsages::INDEX;
        }

        let (bytes, stride) = if component_type.is_narrow_integer() {
            let widened = self.read_widened();
            (
                Cow::Owned(bytemuck::cast_slice(&widened).to_vec()),
                size_of::<u32>() * element_type.components(),
            )
        } else if self.stride == self.accessor.element_size() {
            (Cow::Borrowed(self.bytes), self.stride)
        } else {
            (Cow::Owned(self.elements().flatten().copied().collect()), self.accessor.element_size())
        };

        AccessorUpload {
            bytes,
            stride: stride as u32,
            count: self.accessor.count as u32,
            usage,
        }
    }
}

/// Accessor data ready to be turned into a buffer.
pub struct AccessorUpload<'a> {
    pub bytes: Cow<'a, [u8]>,
    pub stride: u32,
    pub count: u32,
    pub usage: BufferUsages,
}

/// Create a buffer in `store` holding the data of accessor `index`.
pub fn upload_accessor(
    document: &AssetDocument,
    index: usize,
    store: &dyn BufferStore,
) -> Result<BufferHandle, ModelError> {
    let label = format!("Buffer [{index}] from {}", document.name);
    let view = AccessorView::new(document, index)?;
    if view.component_type().is_narrow_integer() {
        log::debug!("Resizing {label} -> {:?} to u32", view.component_type());
    }

    let upload = view.to_upload();
    let handle = store.create_buffer(&upload.bytes, upload.stride, upload.count, upload.usage, &label)?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{
        asset::{BufferView, DocumentBuilder},
        gpu::buffer::{BufferRegistry, HostMemory},
    };
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(ComponentType::U8 ; "u8")]
    #[test_case(ComponentType::U16 ; "u16")]
    #[test_case(ComponentType::U32 ; "u32")]
    fn indices_are_widened_to_u32(component_type: ComponentType) {
        let expected: Vec<u32> = vec![0, 1, 2, 2, 3, 0, 200];
        let mut builder = DocumentBuilder::new("indices");
        let index = match component_type {
            ComponentType::U8 => {
                builder.push_indices_u8(&expected.iter().map(|&i| i as u8).collect::<Vec<_>>())
            }
            ComponentType::U16 => {
                builder.push_indices_u16(&expected.iter().map(|&i| i as u16).collect::<Vec<_>>())
            }
            _ => builder.push_indices_u32(&expected),
        };
        let document = builder.build();

        let view = AccessorView::new(&document, index).unwrap();
        assert_eq!(view.read_indices().unwrap(), expected);

        let registry = BufferRegistry::new(HostMemory);
        let handle = upload_accessor(&document, index, &registry).unwrap();
        let info = registry.info(handle).unwrap();
        assert_eq!(info.stride, 4);
        assert_eq!(info.count as usize, expected.len());
        assert!(info.usage.contains(BufferUsages::INDEX));
        let contents = registry.contents(handle).unwrap();
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, u32>(&contents), expected);
    }

    #[test]
    fn u16_widening_keeps_large_values() {
        let mut builder = DocumentBuilder::new("wide");
        let index = builder.push_indices_u16(&[65535, 40000, 1]);
        let document = builder.build();

        let view = AccessorView::new(&document, index).unwrap();
        assert_eq!(view.read_indices().unwrap(), vec![65535, 40000, 1]);
    }

    #[test]
    fn float_data_is_vertex_usable() {
        let mut builder = DocumentBuilder::new("positions");
        let index = builder.push_vec3s(&[[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);
        let document = builder.build();

        let upload = AccessorView::new(&document, index).unwrap().to_upload();
        assert_eq!(upload.usage, BufferUsages::STORAGE | BufferUsages::VERTEX);
        assert_eq!(upload.stride, 12);
        assert_eq!(upload.count, 2);
        assert!(matches!(upload.bytes, Cow::Borrowed(_)));
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let mut builder = DocumentBuilder::new("truncated");
        let index = builder.push_vec3s(&[[0.0; 3]; 2]);
        let mut document = builder.build();
        document.accessors[index].count = 3;

        let result = AccessorView::new(&document, index);
        assert!(matches!(
            result,
            Err(AssetError::AccessorOutOfBounds {
                accessor,
                end: 36,
                available: 24,
            }) if accessor == index
        ));
    }

    #[test]
    fn interleaved_data_is_packed() {
        // position (vec3) followed by one float of padding
        let interleaved: Vec<f32> = vec![1.0, 2.0, 3.0, -1.0, 4.0, 5.0, 6.0, -1.0];
        let mut document = AssetDocument {
            name: "interleaved".to_string(),
            buffers: vec![bytemuck::cast_slice(&interleaved).to_vec()],
            buffer_views: vec![BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 32,
                byte_stride: Some(16),
            }],
            ..Default::default()
        };
        document.accessors.push(Accessor {
            buffer_view: Some(0),
            byte_offset: 0,
            count: 2,
            component_type: ComponentType::F32,
            element_type: ElementType::Vec3,
        });

        let view = AccessorView::new(&document, 0).unwrap();
        assert_eq!(
            view.read::<[f32; 3]>().unwrap(),
            vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
        );
        let upload = view.to_upload();
        assert_eq!(upload.stride, 12);
        assert_eq!(
            bytemuck::pod_collect_to_vec::<u8, f32>(&upload.bytes),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn missing_view_is_an_error() {
        let mut builder = DocumentBuilder::new("sparse");
        let index = builder.push_scalars(&[1.0]);
        let mut document = builder.build();
        document.accessors[index].buffer_view = None;

        assert!(matches!(
            AccessorView::new(&document, index),
            Err(AssetError::MissingBufferView(_))
        ));
        assert!(matches!(
            AccessorView::new(&document, 42),
            Err(AssetError::AccessorNotFound(42))
        ));
    }
}
