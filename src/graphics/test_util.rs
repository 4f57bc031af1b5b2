use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use cgmath::Matrix4;

use crate::graphics::{
    asset::{
        Animation, AnimationChannel, AnimationSampler, AssetDocument, DocumentBuilder, Mesh,
        MeshPrimitive, Node,
    },
    gpu::blas::{Blas, BlasBuilder, BlasError, BlasPrimitiveRecord, BlasQuality},
};

pub(crate) fn assert_matrix_eq(actual: &Matrix4<f32>, expected: &Matrix4<f32>) {
    let actual_columns: &[[f32; 4]; 4] = actual.as_ref();
    let expected_columns: &[[f32; 4]; 4] = expected.as_ref();
    for (a, e) in actual_columns.iter().flatten().zip(expected_columns.iter().flatten()) {
        assert!(
            (a - e).abs() < 1e-4,
            "matrices differ:\n  actual: {actual:?}\nexpected: {expected:?}"
        );
    }
}

/// Push a one-triangle mesh with u16 indices.
pub(crate) fn triangle_mesh(builder: &mut DocumentBuilder, material: Option<usize>) -> usize {
    let position = builder.push_vec3s(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let indices = builder.push_indices_u16(&[0, 1, 2]);
    builder.push_mesh(Mesh {
        primitives: vec![MeshPrimitive {
            position: Some(position),
            indices: Some(indices),
            material,
            ..Default::default()
        }],
    })
}

/// A root node (0) with a child (1) one unit up, each with a triangle.
/// The root's translation is animated.
pub(crate) fn animated_document(
    times: &[f32],
    translations: &[[f32; 3]],
    interpolation: &str,
) -> AssetDocument {
    let mut builder = DocumentBuilder::new("animated");
    let mesh = triangle_mesh(&mut builder, None);
    let root = builder.push_node(Node {
        mesh: Some(mesh),
        ..Default::default()
    });
    let child = builder.push_node(Node {
        mesh: Some(mesh),
        ..Node::with_translation([0.0, 1.0, 0.0])
    });
    builder.add_child(root, child);

    let input = builder.push_scalars(times);
    let output = builder.push_vec3s(translations);
    builder.push_animation(Animation {
        channels: vec![AnimationChannel {
            sampler: 0,
            target_node: Some(root),
            target_path: "translation".to_string(),
        }],
        samplers: vec![AnimationSampler {
            input,
            output,
            interpolation: interpolation.to_string(),
        }],
    });
    builder.push_scene(vec![root]);
    builder.build()
}

/// Counts what happens to the BLASes it builds.
#[derive(Clone, Default)]
pub(crate) struct RecordingBlasBuilder {
    pub builds: Arc<Mutex<Vec<(BlasQuality, usize)>>>,
    pub updates: Arc<AtomicUsize>,
    pub fail: bool,
}

impl RecordingBlasBuilder {
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl BlasBuilder for RecordingBlasBuilder {
    fn build(
        &self,
        records: &[BlasPrimitiveRecord],
        quality: BlasQuality,
        label: &str,
    ) -> Result<Box<dyn Blas>, BlasError> {
        if self.fail {
            return Err(BlasError::BuildFailed {
                label: label.to_string(),
                reason: "test failure".to_string(),
            });
        }
        self.builds.lock().unwrap().push((quality, records.len()));
        Ok(Box::new(RecordingBlas {
            updates: self.updates.clone(),
        }))
    }
}

struct RecordingBlas {
    updates: Arc<AtomicUsize>,
}

impl Blas for RecordingBlas {
    fn update(&mut self, _records: &[BlasPrimitiveRecord]) -> Result<(), BlasError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
