use cgmath::Matrix4;
use thiserror::Error;

use crate::graphics::gpu::buffer::BufferHandle;

/// Build preference handed to the acceleration-structure builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlasQuality {
    FastBuild,
    FastTraversal,
    /// Like `FastBuild`, but kept refittable for animated geometry.
    RefitFastBuild,
    /// Like `FastTraversal`, but kept refittable for animated geometry.
    RefitFastTraversal,
}

impl BlasQuality {
    /// Whether the structure is built to support `Blas::update`.
    pub fn refittable(self) -> bool {
        matches!(self, Self::RefitFastBuild | Self::RefitFastTraversal)
    }
}

/// Geometry and placement of one primitive inside a BLAS.
///
/// One record exists per entry of the model's primitive list, in the same order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlasPrimitiveRecord {
    /// Position buffer.
    pub vertex_buffer: BufferHandle,
    /// u32 index buffer.
    pub index_buffer: BufferHandle,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Primitive-to-model space matrix.
    pub model: Matrix4<f32>,
}

/// Builds a bottom-level acceleration structure for one model.
pub trait BlasBuilder: Send + Sync {
    fn build(
        &self,
        records: &[BlasPrimitiveRecord],
        quality: BlasQuality,
        label: &str,
    ) -> Result<Box<dyn Blas>, BlasError>;
}

/// A built bottom-level acceleration structure.
pub trait Blas: Send {
    /// Refit against the records' current transforms.
    fn update(&mut self, records: &[BlasPrimitiveRecord]) -> Result<(), BlasError>;
}

#[derive(Debug, Error)]
pub enum BlasError {
    #[error("Couldn't build BLAS \"{label}\": {reason}")]
    BuildFailed { label: String, reason: String },
    #[error("Couldn't refit BLAS: {0}")]
    RefitFailed(String),
}
