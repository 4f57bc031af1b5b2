use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Transform, Vector3, Zero};
use rustc_hash::FxHashMap;

use crate::graphics::asset::AssetError;

/// A triangle in mesh space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vector3<f32>; 3],
    /// Unit face normal, counter-clockwise winding. Zero for degenerate triangles.
    pub normal: Vector3<f32>,
}

impl Triangle {
    pub fn new(vertices: [Vector3<f32>; 3]) -> Self {
        let [a, b, c] = vertices;
        let cross = (b - a).cross(c - a);
        let normal = if cross.magnitude2() > 0.0 {
            cross.normalize()
        } else {
            Vector3::zero()
        };
        Self { vertices, normal }
    }

    /// Get the triangle moved into the space of `model`.
    pub fn transformed(&self, model: &Matrix4<f32>) -> Triangle {
        Triangle::new(self.vertices.map(|vertex| {
            let point = model.transform_point(Point3::from_vec(vertex));
            Vector3::new(point.x, point.y, point.z)
        }))
    }
}

/// Key of a (position buffer, index buffer) pair, by their slots in the model's buffer table.
pub fn physics_key(position: u32, indices: u32) -> u64 {
    (position as u64) << 32 | indices as u64
}

/// CPU copies of every unique piece of geometry in a model, for collision queries.
///
/// Combine with a primitive's current and previous matrices to get world-space triangles.
#[derive(Clone, Debug, Default)]
pub struct CpuPhysicsData {
    triangles: FxHashMap<u64, Vec<Triangle>>,
}

impl CpuPhysicsData {
    /// Whether the geometry of `key` is stored.
    pub fn contains(&self, key: u64) -> bool {
        self.triangles.contains_key(&key)
    }

    /// Store the triangles of `positions` indexed by `indices`, unless `key` is already stored.
    ///
    /// `index_accessor` is only used for the error.
    pub fn insert(
        &mut self,
        key: u64,
        positions: &[[f32; 3]],
        indices: &[u32],
        index_accessor: usize,
    ) -> Result<(), AssetError> {
        if self.contains(key) {
            return Ok(());
        }

        let vertex = |index: u32| {
            positions
                .get(index as usize)
                .map(|&position| Vector3::from(position))
                .ok_or(AssetError::VertexIndexOutOfRange {
                    accessor: index_accessor,
                    index,
                    vertex_count: positions.len(),
                })
        };
        let triangles = indices
            .chunks_exact(3)
            .map(|corners| {
                Ok(Triangle::new([
                    vertex(corners[0])?,
                    vertex(corners[1])?,
                    vertex(corners[2])?,
                ]))
            })
            .collect::<Result<Vec<_>, AssetError>>()?;

        self.triangles.insert(key, triangles);
        Ok(())
    }

    /// Get the mesh-space triangles of `key`.
    pub fn triangles(&self, key: u64) -> Option<&[Triangle]> {
        self.triangles.get(&key).map(Vec::as_slice)
    }

    /// Number of unique geometry pairs stored.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
