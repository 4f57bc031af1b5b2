use std::ops::Range;

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

use crate::graphics::{
    asset::{Node, NodeTransform},
    scene::spatial_transform::SpatialTransform,
};

/// A node in the scene graph, as needed for flattening.
///
/// Only lives while a model is being loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    local_transform: Matrix4<f32>,
    children: Vec<usize>,
    mesh: Option<usize>,
}

impl SceneNode {
    /// Create a scene node from an asset node.
    pub fn from_asset(node: &Node) -> Self {
        Self {
            local_transform: local_matrix(&node.transform),
            children: node.children.clone(),
            mesh: node.mesh,
        }
    }

    /// Get the transform relative to the parent.
    pub fn local_transform(&self) -> Matrix4<f32> {
        self.local_transform
    }

    /// Get the children.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Get the mesh.
    pub fn mesh(&self) -> Option<usize> {
        self.mesh
    }
}

/// Get the local matrix of an asset node.
pub fn local_matrix(transform: &NodeTransform) -> Matrix4<f32> {
    match *transform {
        NodeTransform::Matrix(matrix) => matrix.into(),
        NodeTransform::Decomposed {
            translation,
            rotation: [x, y, z, w],
            scale,
        } => SpatialTransform {
            scale: Vector3::from(scale),
            position: Vector3::from(translation),
            rotation: Quaternion::new(w, x, y, z),
        }
        .to_matrix(),
    }
}

/// What animation needs to know about a source node once the hierarchy is flattened.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimNode {
    prim_start: u32,
    prim_end: u32,
    children: Vec<usize>,
    world: Matrix4<f32>,
}

impl Default for AnimNode {
    fn default() -> Self {
        Self {
            prim_start: 0,
            prim_end: 0,
            children: Vec::new(),
            world: Matrix4::identity(),
        }
    }
}

impl AnimNode {
    pub(crate) fn new(primitives: Range<u32>, children: Vec<usize>, world: Matrix4<f32>) -> Self {
        Self {
            prim_start: primitives.start,
            prim_end: primitives.end,
            children,
            world,
        }
    }

    /// The slice of the primitive list owned by this node's mesh.
    pub fn primitives(&self) -> Range<usize> {
        self.prim_start as usize..self.prim_end as usize
    }

    /// Get the node indices of the children.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// The node's current world matrix.
    pub fn world(&self) -> Matrix4<f32> {
        self.world
    }

    pub(crate) fn set_world(&mut self, world: Matrix4<f32>) {
        self.world = world;
    }
}
