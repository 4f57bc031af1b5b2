use bytemuck::Pod;

use crate::graphics::asset::{
    Accessor, Animation, AssetDocument, BufferView, ComponentType, ElementType, Material, Mesh,
    Node, Scene,
};

/// Assembles an `AssetDocument` in memory.
///
/// All accessor data goes into a single backing buffer, each accessor with its own view.
pub struct DocumentBuilder {
    document: AssetDocument,
}

impl DocumentBuilder {
    /// Start an empty document.
    pub fn new(name: &str) -> Self {
        Self {
            document: AssetDocument {
                name: name.to_string(),
                buffers: vec![Vec::new()],
                ..Default::default()
            },
        }
    }

    /// Append `data` as a new accessor, returning its index.
    pub fn push_accessor<T: Pod>(
        &mut self,
        data: &[T],
        component_type: ComponentType,
        element_type: ElementType,
    ) -> usize {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = &mut self.document.buffers[0];
        buffer.resize(buffer.len().next_multiple_of(4), 0);
        let byte_offset = buffer.len();
        buffer.extend_from_slice(bytes);

        self.document.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset,
            byte_length: bytes.len(),
            byte_stride: None,
        });
        let element_size = component_type.size() * element_type.components();
        self.document.accessors.push(Accessor {
            buffer_view: Some(self.document.buffer_views.len() - 1),
            byte_offset: 0,
            count: bytes.len() / element_size,
            component_type,
            element_type,
        });
        self.document.accessors.len() - 1
    }

    pub fn push_scalars(&mut self, data: &[f32]) -> usize {
        self.push_accessor(data, ComponentType::F32, ElementType::Scalar)
    }

    pub fn push_vec3s(&mut self, data: &[[f32; 3]]) -> usize {
        self.push_accessor(data, ComponentType::F32, ElementType::Vec3)
    }

    pub fn push_vec4s(&mut self, data: &[[f32; 4]]) -> usize {
        self.push_accessor(data, ComponentType::F32, ElementType::Vec4)
    }

    pub fn push_indices_u8(&mut self, data: &[u8]) -> usize {
        self.push_accessor(data, ComponentType::U8, ElementType::Scalar)
    }

    pub fn push_indices_u16(&mut self, data: &[u16]) -> usize {
        self.push_accessor(data, ComponentType::U16, ElementType::Scalar)
    }

    pub fn push_indices_u32(&mut self, data: &[u32]) -> usize {
        self.push_accessor(data, ComponentType::U32, ElementType::Scalar)
    }

    pub fn push_material(&mut self, material: Material) -> usize {
        self.document.materials.push(material);
        self.document.materials.len() - 1
    }

    pub fn push_mesh(&mut self, mesh: Mesh) -> usize {
        self.document.meshes.push(mesh);
        self.document.meshes.len() - 1
    }

    pub fn push_node(&mut self, node: Node) -> usize {
        self.document.nodes.push(node);
        self.document.nodes.len() - 1
    }

    /// Append `child` to the children of `parent`.
    ///
    /// ## Panic
    /// Panics if `parent` hasn't been pushed yet.
    pub fn add_child(&mut self, parent: usize, child: usize) {
        self.document.nodes[parent].children.push(child);
    }

    pub fn push_animation(&mut self, animation: Animation) -> usize {
        self.document.animations.push(animation);
        self.document.animations.len() - 1
    }

    /// Add a scene. The first scene added becomes the default one.
    pub fn push_scene(&mut self, nodes: Vec<usize>) -> usize {
        self.document.scenes.push(Scene { nodes });
        let index = self.document.scenes.len() - 1;
        self.document.default_scene.get_or_insert(index);
        index
    }

    pub fn build(self) -> AssetDocument {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accessors_are_four_byte_aligned() {
        let mut builder = DocumentBuilder::new("aligned");
        let bytes = builder.push_indices_u8(&[0, 1, 2]);
        let floats = builder.push_scalars(&[0.5]);
        let document = builder.build();

        assert_eq!(document.accessors[bytes].count, 3);
        let view = &document.buffer_views[document.accessors[floats].buffer_view.unwrap()];
        assert_eq!(view.byte_offset, 4);
        assert_eq!(document.buffers[0].len(), 8);
    }

    #[test]
    fn first_scene_is_default() {
        let mut builder = DocumentBuilder::new("scenes");
        let root = builder.push_node(Node::default());
        builder.push_scene(vec![root]);
        builder.push_scene(vec![]);
        let document = builder.build();

        assert_eq!(document.default_scene, Some(0));
        assert_eq!(document.root_nodes().unwrap(), &[root]);
    }
}
