use std::sync::{Arc, Mutex};

use cgmath::{Matrix4, SquareMatrix, Vector3};
use pretty_assertions::assert_eq;
use rt_model::{
    AssetError, Blas, BlasBuilder, BlasError, BlasPrimitiveRecord, BlasQuality, BufferRegistry,
    DocumentBuilder, HostMemory, Model, ModelError, ModelLibrary, Primitive,
    graphics::asset::{Animation, AnimationChannel, AnimationSampler, Mesh, MeshPrimitive, Node},
};

/// Keeps the record arrays it was built and refit with.
#[derive(Clone, Default)]
struct CapturingBlasBuilder {
    refits: Arc<Mutex<Vec<Vec<BlasPrimitiveRecord>>>>,
}

impl BlasBuilder for CapturingBlasBuilder {
    fn build(
        &self,
        records: &[BlasPrimitiveRecord],
        _quality: BlasQuality,
        _label: &str,
    ) -> Result<Box<dyn Blas>, BlasError> {
        assert!(!records.is_empty());
        Ok(Box::new(CapturingBlas {
            refits: self.refits.clone(),
        }))
    }
}

struct CapturingBlas {
    refits: Arc<Mutex<Vec<Vec<BlasPrimitiveRecord>>>>,
}

impl Blas for CapturingBlas {
    fn update(&mut self, records: &[BlasPrimitiveRecord]) -> Result<(), BlasError> {
        self.refits.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

fn assert_close(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    let actual: [[f32; 4]; 4] = actual.into();
    let expected: [[f32; 4]; 4] = expected.into();
    for (a, e) in actual.iter().flatten().zip(expected.iter().flatten()) {
        assert!((a - e).abs() < 1e-4, "{actual:?} != {expected:?}");
    }
}

/// Hinge (translated) -> door (offset, with a quad) -> handle (offset, with a quad).
/// The hinge slides along x over two seconds.
fn door_document() -> rt_model::AssetDocument {
    let mut builder = DocumentBuilder::new("door");
    let positions = builder.push_vec3s(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ]);
    let indices = builder.push_indices_u8(&[0, 1, 2, 2, 3, 0]);
    let quad = builder.push_mesh(Mesh {
        primitives: vec![MeshPrimitive {
            position: Some(positions),
            indices: Some(indices),
            ..Default::default()
        }],
    });

    let hinge = builder.push_node(Node::with_translation([1.0, 0.0, 0.0]));
    let door = builder.push_node(Node {
        mesh: Some(quad),
        ..Node::with_translation([0.0, 0.0, 1.0])
    });
    let handle = builder.push_node(Node {
        mesh: Some(quad),
        ..Node::with_translation([0.5, 0.0, 0.0])
    });
    builder.add_child(hinge, door);
    builder.add_child(door, handle);

    let times = builder.push_scalars(&[0.0, 2.0]);
    let slide = builder.push_vec3s(&[[1.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
    builder.push_animation(Animation {
        channels: vec![AnimationChannel {
            sampler: 0,
            target_node: Some(hinge),
            target_path: "translation".to_string(),
        }],
        samplers: vec![AnimationSampler {
            input: times,
            output: slide,
            interpolation: "LINEAR".to_string(),
        }],
    });
    builder.push_scene(vec![hinge]);
    builder.build()
}

#[test]
fn load_animate_refit_unload() {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = BufferRegistry::new(HostMemory);
    let blas_builder = CapturingBlasBuilder::default();
    let document = door_document();

    let mut model = Model::load(&document, &registry, &blas_builder).unwrap();
    assert!(model.has_animation());
    assert_eq!(model.primitives().len(), 2);
    let ranges: Vec<_> = model
        .scene()
        .anim_nodes()
        .iter()
        .map(|node| node.primitives())
        .collect();
    assert_eq!(ranges, vec![0..0, 0..1, 1..2]);

    let door_before = model.primitives()[0].model();
    let handle_before = model.primitives()[1].model();
    assert_close(handle_before, Matrix4::from_translation(Vector3::new(1.5, 0.0, 1.0)));

    // Hinge moves from x = 1 to x = 2.
    model.update_animations(0.5);
    let hinge_before = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0));
    let hinge_after = Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0));
    let delta = hinge_after * hinge_before.invert().unwrap();
    assert_close(model.primitives()[0].model(), delta * door_before);
    assert_close(model.primitives()[1].model(), delta * handle_before);
    assert_close(model.previous_matrices()[1], handle_before);

    model.rebuild_blas(&registry).unwrap();
    let refits = blas_builder.refits.lock().unwrap().clone();
    assert_eq!(refits.len(), 1);
    assert_close(refits[0][1].model, delta * handle_before);

    let uploaded = registry.contents(model.primitive_buffer()).unwrap();
    let primitives: Vec<Primitive> = bytemuck::pod_collect_to_vec(&uploaded);
    assert_eq!(primitives, model.primitives());

    model.unload(&registry).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn library_drives_controllers() {
    let registry = BufferRegistry::new(HostMemory);
    let blas_builder = CapturingBlasBuilder::default();
    let documents = vec![door_document(), door_document()];

    let mut library = ModelLibrary::load(&documents, &registry, &blas_builder).unwrap();
    library.entries_mut()[1]
        .controller
        .as_mut()
        .unwrap()
        .set_paused(true);

    for _ in 0..10 {
        library.update_animations(0.05);
        library.rebuild_blases(&registry).unwrap();
    }
    assert_eq!(blas_builder.refits.lock().unwrap().len(), 10);

    // 0.5 seconds in: the hinge is at x = 2 on the playing model only.
    let moving = library.entries()[0].model.primitives()[0].model();
    let paused = library.entries()[1].model.primitives()[0].model();
    assert_close(moving, Matrix4::from_translation(Vector3::new(2.0, 0.0, 1.0)));
    assert_close(paused, Matrix4::from_translation(Vector3::new(1.0, 0.0, 1.0)));

    library.unload_all(&registry).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn malformed_asset_leaves_nothing_behind() {
    let registry = BufferRegistry::new(HostMemory);
    let mut document = door_document();
    document.accessors[0].count = 100;

    let result = Model::load(&document, &registry, &CapturingBlasBuilder::default());
    assert!(matches!(
        result,
        Err(ModelError::Asset(AssetError::AccessorOutOfBounds { accessor: 0, .. }))
    ));
    assert!(registry.is_empty());
}
