pub mod constants;
pub mod graphics;

pub use graphics::{
    animation::{AnimationController, AnimationEvaluator, AnimationTrackStore},
    asset::{AssetDocument, AssetError, DocumentBuilder},
    gpu::{
        blas::{Blas, BlasBuilder, BlasError, BlasPrimitiveRecord, BlasQuality},
        buffer::{BufferError, BufferHandle, BufferRegistry, BufferStore, HostMemory},
    },
    model::{Model, ModelError, library::ModelLibrary},
    scene::{FlattenedScene, primitive::Primitive},
};
