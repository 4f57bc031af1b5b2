use bytemuck::{Pod, Zeroable};
use cgmath::Matrix4;

use crate::graphics::gpu::{blas::BlasPrimitiveRecord, buffer::BufferHandle};

/// Marks an unused buffer slot.
pub const NO_SLOT: i32 = -1;

/// One traceable primitive, laid out as the shaders read it.
///
/// Buffer slots are positions in the owning model's buffer table.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Primitive {
    pub material: i32,
    pub index_buffer: i32,
    pub position: i32,
    pub tex_coord: i32,
    pub tangent: i32,
    pub normal: i32,
    pub color: i32,
    _padding: i32,
    model: [[f32; 4]; 4],
}

impl Primitive {
    /// A primitive with every slot unset and an identity matrix.
    pub fn empty() -> Self {
        Self {
            material: NO_SLOT,
            index_buffer: NO_SLOT,
            position: NO_SLOT,
            tex_coord: NO_SLOT,
            tangent: NO_SLOT,
            normal: NO_SLOT,
            color: NO_SLOT,
            _padding: 0,
            model: Matrix4::from_scale(1.0).into(),
        }
    }

    /// Get the primitive-to-model matrix.
    pub fn model(&self) -> Matrix4<f32> {
        self.model.into()
    }

    /// Set the model matrix.
    pub fn set_model(&mut self, model: Matrix4<f32>) {
        self.model = model.into();
    }
}

/// A primitive whose material emits enough light to be sampled directly.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct EmissivePrimitive {
    pub primitive_id: u32,
    pub triangle_count: u32,
}

/// A mesh primitive as loaded, before it gets placed in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrimitiveSource {
    /// Slots filled in, model matrix left as identity.
    pub template: Primitive,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub vertex_count: u32,
    pub index_count: u32,
    pub emissive: bool,
}

impl PrimitiveSource {
    /// Place the primitive with `model`, returning its GPU record and BLAS record.
    pub fn instantiate(&self, model: Matrix4<f32>) -> (Primitive, BlasPrimitiveRecord) {
        let mut primitive = self.template;
        primitive.set_model(model);
        let record = BlasPrimitiveRecord {
            vertex_buffer: self.vertex_buffer,
            index_buffer: self.index_buffer,
            vertex_count: self.vertex_count,
            index_count: self.index_count,
            model,
        };
        (primitive, record)
    }

    /// Number of triangles drawn by the index buffer.
    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_layout() {
        assert_eq!(size_of::<Primitive>(), 8 * 4 + 16 * 4);
        assert_eq!(std::mem::offset_of!(Primitive, model), 32);
        assert_eq!(size_of::<EmissivePrimitive>(), 8);
    }
}
