use std::path::PathBuf;

use anyhow::Context;
use cgmath::{Deg, Quaternion, Rotation3, Vector3};
use clap::Parser;
use log::{debug, info};
use rt_model::{
    AssetDocument, Blas, BlasBuilder, BlasError, BlasPrimitiveRecord, BlasQuality, BufferRegistry,
    BufferStore, DocumentBuilder, HostMemory, ModelLibrary,
    constants::DEFAULT_FRAME_DELTA,
    graphics::{
        asset::{
            Animation, AnimationChannel, AnimationSampler, Material, Mesh, MeshPrimitive, Node,
            import::import_gltf,
        },
        gpu::GpuContext,
    },
};

/// Load models and step their animations, logging what the ray tracer would be handed.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// glTF/GLB files to load. A built-in animated scene is used if none are given.
    paths: Vec<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 100)]
    frames: u32,

    /// Create buffers on the GPU instead of in host memory.
    #[arg(long)]
    gpu: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let documents = if cli.paths.is_empty() {
        vec![procedural_scene()]
    } else {
        cli.paths
            .iter()
            .map(import_gltf)
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    if cli.gpu {
        let gpu = pollster::block_on(GpuContext::headless())?;
        run(&documents, &BufferRegistry::new(gpu), cli.frames)
    } else {
        run(&documents, &BufferRegistry::new(HostMemory), cli.frames)
    }
}

fn run(documents: &[AssetDocument], store: &dyn BufferStore, frames: u32) -> anyhow::Result<()> {
    let mut library =
        ModelLibrary::load(documents, store, &LoggedBlasBuilder).context("Couldn't load models")?;
    info!("{} emissive primitives", library.emissive_count());

    for frame in 0..frames {
        library.update_animations(DEFAULT_FRAME_DELTA);
        library.rebuild_blases(store)?;

        for entry in library.entries() {
            for (id, primitive) in entry.model.primitives().iter().enumerate() {
                let translation = primitive.model().w;
                debug!(
                    "Frame {frame}: {} primitive {id} at ({:.3}, {:.3}, {:.3})",
                    entry.model.name(),
                    translation.x,
                    translation.y,
                    translation.z
                );
            }
        }
    }

    library.unload_all(store)?;
    Ok(())
}

/// Stands in for a ray tracing backend.
struct LoggedBlasBuilder;

impl BlasBuilder for LoggedBlasBuilder {
    fn build(
        &self,
        records: &[BlasPrimitiveRecord],
        quality: BlasQuality,
        label: &str,
    ) -> Result<Box<dyn Blas>, BlasError> {
        let triangles: u32 = records.iter().map(|record| record.index_count / 3).sum();
        info!(
            "Building \"{label}\" ({quality:?}): {} primitives, {triangles} triangles",
            records.len()
        );
        Ok(Box::new(LoggedBlas {
            label: label.to_string(),
        }))
    }
}

struct LoggedBlas {
    label: String,
}

impl Blas for LoggedBlas {
    fn update(&mut self, records: &[BlasPrimitiveRecord]) -> Result<(), BlasError> {
        debug!("Refitting \"{}\" with {} primitives", self.label, records.len());
        Ok(())
    }
}

/// A spinning arm holding a cube, under a glowing panel that hops up and down.
fn procedural_scene() -> AssetDocument {
    let mut builder = DocumentBuilder::new("procedural");

    let cube_positions = builder.push_vec3s(&[
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ]);
    let cube_indices = builder.push_indices_u16(&[
        0, 2, 1, 0, 3, 2, // back
        4, 5, 6, 4, 6, 7, // front
        0, 1, 5, 0, 5, 4, // bottom
        3, 7, 6, 3, 6, 2, // top
        0, 4, 7, 0, 7, 3, // left
        1, 2, 6, 1, 6, 5, // right
    ]);
    let cube = builder.push_mesh(Mesh {
        primitives: vec![MeshPrimitive {
            position: Some(cube_positions),
            indices: Some(cube_indices),
            ..Default::default()
        }],
    });

    let panel_positions = builder.push_vec3s(&[
        [-1.0, 0.0, -1.0],
        [1.0, 0.0, -1.0],
        [1.0, 0.0, 1.0],
        [-1.0, 0.0, 1.0],
    ]);
    let panel_indices = builder.push_indices_u8(&[0, 2, 1, 0, 3, 2]);
    let light = builder.push_material(Material {
        emissive_strength: 8.0,
    });
    let panel = builder.push_mesh(Mesh {
        primitives: vec![MeshPrimitive {
            position: Some(panel_positions),
            indices: Some(panel_indices),
            material: Some(light),
            ..Default::default()
        }],
    });

    let arm = builder.push_node(Node::default());
    let held_cube = builder.push_node(Node {
        mesh: Some(cube),
        ..Node::with_translation([2.0, 0.0, 0.0])
    });
    builder.add_child(arm, held_cube);
    let lamp = builder.push_node(Node {
        mesh: Some(panel),
        ..Node::with_translation([0.0, 4.0, 0.0])
    });

    let times = builder.push_scalars(&[0.0, 1.0, 2.0, 3.0, 4.0]);
    let rotations: Vec<[f32; 4]> = [0.0, 90.0, 180.0, 270.0, 360.0]
        .iter()
        .map(|&angle| {
            let q = Quaternion::from_axis_angle(Vector3::unit_y(), Deg(angle));
            [q.v.x, q.v.y, q.v.z, q.s]
        })
        .collect();
    let rotations = builder.push_vec4s(&rotations);
    let flicker = builder.push_vec3s(&[
        [0.0, 4.0, 0.0],
        [0.0, 4.5, 0.0],
        [0.0, 4.0, 0.0],
        [0.0, 4.5, 0.0],
        [0.0, 4.0, 0.0],
    ]);
    builder.push_animation(Animation {
        channels: vec![
            AnimationChannel {
                sampler: 0,
                target_node: Some(arm),
                target_path: "rotation".to_string(),
            },
            AnimationChannel {
                sampler: 1,
                target_node: Some(lamp),
                target_path: "translation".to_string(),
            },
        ],
        samplers: vec![
            AnimationSampler {
                input: times,
                output: rotations,
                interpolation: "LINEAR".to_string(),
            },
            AnimationSampler {
                input: times,
                output: flicker,
                interpolation: "STEP".to_string(),
            },
        ],
    });

    builder.push_scene(vec![arm, lamp]);
    builder.build()
}
