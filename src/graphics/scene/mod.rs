pub mod node;
pub mod physics;
pub mod primitive;
pub mod spatial_transform;

use cgmath::{Matrix4, SquareMatrix};

use crate::graphics::{
    asset::AssetError,
    gpu::blas::BlasPrimitiveRecord,
    scene::{
        node::{AnimNode, SceneNode},
        primitive::{EmissivePrimitive, Primitive, PrimitiveSource},
    },
};

/// The loaded primitives of one asset mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    primitives: Vec<PrimitiveSource>,
}

impl Mesh {
    /// Create a mesh. Asset mesh `index` is only used for the error.
    pub fn new(index: usize, primitives: Vec<PrimitiveSource>) -> Result<Self, AssetError> {
        if primitives.is_empty() {
            return Err(AssetError::EmptyMesh(index));
        }
        Ok(Self { primitives })
    }

    /// Get the primitives, in mesh order.
    pub fn primitives(&self) -> &[PrimitiveSource] {
        &self.primitives
    }
}

/// The scene hierarchy baked into a flat, ordered primitive list.
///
/// A primitive's position in the list is its identity for the rest of the model's lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct FlattenedScene {
    pub(crate) primitives: Vec<Primitive>,
    pub(crate) blas_records: Vec<BlasPrimitiveRecord>,
    pub(crate) emissive: Vec<EmissivePrimitive>,
    pub(crate) anim_nodes: Vec<AnimNode>,
    pub(crate) previous_matrices: Vec<Matrix4<f32>>,
}

impl FlattenedScene {
    /// Get the primitives, in traversal order.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Get the raw bytes of the primitive list.
    pub fn primitive_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.primitives)
    }

    /// Get the BLAS records, one per primitive, same order.
    pub fn blas_records(&self) -> &[BlasPrimitiveRecord] {
        &self.blas_records
    }

    /// Get the primitives with a bright enough emissive material.
    pub fn emissive(&self) -> &[EmissivePrimitive] {
        &self.emissive
    }

    /// Get the per-node table, indexed like the asset's nodes.
    pub fn anim_nodes(&self) -> &[AnimNode] {
        &self.anim_nodes
    }

    /// Each primitive's matrix as it was before the last animation update.
    pub fn previous_matrices(&self) -> &[Matrix4<f32>] {
        &self.previous_matrices
    }

    /// Set the matrix of primitive `index` on both the GPU and BLAS side.
    pub(crate) fn set_primitive_model(&mut self, index: usize, model: Matrix4<f32>) {
        self.primitives[index].set_model(model);
        self.blas_records[index].model = model;
    }

    /// Copy every primitive's current matrix into its previous-matrix slot.
    pub(crate) fn snapshot_previous(&mut self) {
        for (previous, primitive) in self.previous_matrices.iter_mut().zip(&self.primitives) {
            *previous = primitive.model();
        }
    }
}

/// Walk the hierarchy from `roots` depth-first in pre-order, placing every mesh primitive.
///
/// Siblings are visited in declaration order, as are the primitives of a mesh.
/// Each node may be reached only once.
pub fn flatten(
    nodes: &[SceneNode],
    meshes: &[Mesh],
    roots: &[usize],
) -> Result<FlattenedScene, AssetError> {
    let mut scene = FlattenedScene {
        primitives: Vec::new(),
        blas_records: Vec::new(),
        emissive: Vec::new(),
        anim_nodes: vec![AnimNode::default(); nodes.len()],
        previous_matrices: Vec::new(),
    };
    let mut visited = vec![false; nodes.len()];

    // Reversed so the first root/child pops first.
    let mut stack: Vec<(usize, Matrix4<f32>)> = roots
        .iter()
        .rev()
        .map(|&root| (root, Matrix4::identity()))
        .collect();

    while let Some((node_index, parent)) = stack.pop() {
        let node = nodes
            .get(node_index)
            .ok_or(AssetError::NodeNotFound(node_index))?;
        if std::mem::replace(&mut visited[node_index], true) {
            return Err(AssetError::NodeReachedTwice(node_index));
        }

        let world = parent * node.local_transform();
        let start = scene.primitives.len() as u32;
        if let Some(mesh_index) = node.mesh() {
            let mesh = meshes.get(mesh_index).ok_or(AssetError::MeshNotFound {
                node: node_index,
                mesh: mesh_index,
            })?;
            for source in mesh.primitives() {
                let (primitive, record) = source.instantiate(world);
                if source.emissive {
                    scene.emissive.push(EmissivePrimitive {
                        primitive_id: scene.primitives.len() as u32,
                        triangle_count: source.triangle_count(),
                    });
                }
                scene.primitives.push(primitive);
                scene.blas_records.push(record);
            }
        }
        let end = scene.primitives.len() as u32;

        scene.anim_nodes[node_index] = AnimNode::new(start..end, node.children().to_vec(), world);
        stack.extend(node.children().iter().rev().map(|&child| (child, world)));
    }

    scene.previous_matrices = scene.primitives.iter().map(Primitive::model).collect();
    Ok(scene)
}
