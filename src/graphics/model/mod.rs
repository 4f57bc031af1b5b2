pub mod library;

use log::{info, warn};
use thiserror::Error;
use web_time::Instant;
use wgpu::BufferUsages;

use crate::{
    constants::EMISSIVE_LIGHT_THRESHOLD,
    graphics::{
        animation::{AnimationEvaluator, AnimationTrackStore},
        asset::{
            AssetDocument, AssetError, MeshPrimitive,
            accessor::{AccessorView, upload_accessor},
        },
        gpu::{
            blas::{Blas, BlasBuilder, BlasError, BlasPrimitiveRecord, BlasQuality},
            buffer::{BufferError, BufferHandle, BufferStore},
        },
        scene::{
            self, FlattenedScene, Mesh,
            node::SceneNode,
            physics::{CpuPhysicsData, physics_key},
            primitive::{EmissivePrimitive, NO_SLOT, Primitive, PrimitiveSource},
        },
    },
};

/// A loaded asset: its buffers, flattened primitives, animation and BLAS.
pub struct Model {
    name: String,
    /// Accessor buffers by accessor index, then generated index buffers.
    buffers: Vec<BufferHandle>,
    primitive_buffer: BufferHandle,
    scene: FlattenedScene,
    evaluator: Option<AnimationEvaluator>,
    blas: Box<dyn Blas>,
    physics: CpuPhysicsData,
}

impl Model {
    /// Load `document`, creating its buffers in `store` and its BLAS with `blas_builder`.
    ///
    /// On failure, every buffer created so far is destroyed again.
    pub fn load(
        document: &AssetDocument,
        store: &dyn BufferStore,
        blas_builder: &dyn BlasBuilder,
    ) -> Result<Self, ModelError> {
        let start = Instant::now();
        let mut buffers = Vec::new();

        match Self::load_into(document, store, blas_builder, &mut buffers) {
            Ok(model) => {
                info!(
                    "Loaded model \"{}\" in {:.2?}: {} primitives, {} emissive, {} buffers, animated: {}",
                    model.name,
                    start.elapsed(),
                    model.scene.primitives().len(),
                    model.scene.emissive().len(),
                    model.buffers.len() + 1,
                    model.has_animation()
                );
                Ok(model)
            }
            Err(err) => {
                for handle in buffers {
                    if let Err(destroy_err) = store.destroy_buffer(handle) {
                        warn!("Couldn't clean up after failed load of \"{}\": {destroy_err}", document.name);
                    }
                }
                Err(err)
            }
        }
    }

    /// Does the actual loading, pushing every created buffer into `buffers` as it goes.
    fn load_into(
        document: &AssetDocument,
        store: &dyn BufferStore,
        blas_builder: &dyn BlasBuilder,
        buffers: &mut Vec<BufferHandle>,
    ) -> Result<Self, ModelError> {
        for index in 0..document.accessors.len() {
            buffers.push(upload_accessor(document, index, store)?);
        }

        let tracks = AnimationTrackStore::load(document)?;
        let mut physics = CpuPhysicsData::default();

        let mut meshes = Vec::with_capacity(document.meshes.len());
        for (mesh_index, mesh) in document.meshes.iter().enumerate() {
            let primitives = mesh
                .primitives
                .iter()
                .enumerate()
                .map(|(primitive_index, primitive)| {
                    load_primitive(
                        document,
                        (mesh_index, primitive_index),
                        primitive,
                        store,
                        buffers,
                        &mut physics,
                    )
                })
                .collect::<Result<Vec<_>, ModelError>>()?;
            meshes.push(Mesh::new(mesh_index, primitives)?);
        }

        let nodes: Vec<SceneNode> = document.nodes.iter().map(SceneNode::from_asset).collect();
        let scene = scene::flatten(&nodes, &meshes, document.root_nodes()?)?;

        let animated = tracks.has_animation();
        let quality = if animated {
            BlasQuality::RefitFastTraversal
        } else {
            BlasQuality::FastTraversal
        };
        let blas = blas_builder.build(
            scene.blas_records(),
            quality,
            &format!("BLAS from {}", document.name),
        )?;

        let mut usage = BufferUsages::STORAGE;
        if animated {
            usage |= BufferUsages::COPY_DST;
        }
        let primitive_buffer = store.create_buffer(
            scene.primitive_bytes(),
            size_of::<Primitive>() as u32,
            scene.primitives().len() as u32,
            usage,
            &format!("Primitives from {}", document.name),
        )?;

        Ok(Self {
            name: document.name.clone(),
            buffers: std::mem::take(buffers),
            primitive_buffer,
            scene,
            evaluator: animated.then(|| AnimationEvaluator::new(tracks)),
            blas,
            physics,
        })
    }

    /// Move the animated transforms to `time` (in seconds). Does nothing for static models.
    pub fn update_animations(&mut self, time: f32) {
        if let Some(evaluator) = &self.evaluator {
            evaluator.update(time, &mut self.scene);
        }
    }

    /// Refit the BLAS to the current transforms and re-upload the primitives.
    /// Does nothing for static models, whose primitive buffer can't be written to.
    pub fn rebuild_blas(&mut self, store: &dyn BufferStore) -> Result<(), ModelError> {
        if self.evaluator.is_none() {
            return Ok(());
        }
        self.blas.update(self.scene.blas_records())?;
        store.update_buffer(self.primitive_buffer, self.scene.primitive_bytes())?;
        Ok(())
    }

    /// Destroy every buffer the model created.
    pub fn unload(self, store: &dyn BufferStore) -> Result<(), ModelError> {
        for handle in self.buffers.into_iter().chain([self.primitive_buffer]) {
            store.destroy_buffer(handle)?;
        }
        Ok(())
    }

    /// Get the name of the document the model was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the model has at least one transform channel.
    pub fn has_animation(&self) -> bool {
        self.evaluator.is_some()
    }

    /// Get the flattened scene.
    pub fn scene(&self) -> &FlattenedScene {
        &self.scene
    }

    /// Get the primitives in traversal order, with their current matrices.
    pub fn primitives(&self) -> &[Primitive] {
        self.scene.primitives()
    }

    /// Get each primitive's matrix from before the last animation update.
    pub fn previous_matrices(&self) -> &[cgmath::Matrix4<f32>] {
        self.scene.previous_matrices()
    }

    /// Get the primitives bright enough to act as lights.
    pub fn emissive(&self) -> &[EmissivePrimitive] {
        self.scene.emissive()
    }

    /// Get the records the BLAS was built from.
    pub fn blas_records(&self) -> &[BlasPrimitiveRecord] {
        self.scene.blas_records()
    }

    /// Get the buffer table the primitives' slots index into.
    pub fn buffers(&self) -> &[BufferHandle] {
        &self.buffers
    }

    /// Get the GPU copy of `primitives`.
    pub fn primitive_buffer(&self) -> BufferHandle {
        self.primitive_buffer
    }

    /// Get the CPU copies of the model's triangles.
    pub fn physics(&self) -> &CpuPhysicsData {
        &self.physics
    }
}

/// Resolve one mesh primitive to its buffers, generating indices if it has none.
fn load_primitive(
    document: &AssetDocument,
    (mesh, primitive_index): (usize, usize),
    primitive: &MeshPrimitive,
    store: &dyn BufferStore,
    buffers: &mut Vec<BufferHandle>,
    physics: &mut CpuPhysicsData,
) -> Result<PrimitiveSource, ModelError> {
    let position = primitive.position.ok_or(AssetError::MissingPositions {
        mesh,
        primitive: primitive_index,
    })?;
    let positions = AccessorView::new(document, position)?.read::<[f32; 3]>()?;

    let (index_slot, indices, index_accessor) = match primitive.indices {
        Some(accessor) => (accessor, AccessorView::new(document, accessor)?.read_indices()?, accessor),
        None => {
            let indices: Vec<u32> = (0..positions.len() as u32).collect();
            let handle = store.create_buffer(
                bytemuck::cast_slice(&indices),
                size_of::<u32>() as u32,
                indices.len() as u32,
                BufferUsages::STORAGE | BufferUsages::INDEX,
                &format!(
                    "Generated indices of mesh {mesh} primitive {primitive_index} from {}",
                    document.name
                ),
            )?;
            buffers.push(handle);
            (buffers.len() - 1, indices, position)
        }
    };

    let emissive = match primitive.material {
        Some(material) => {
            document
                .materials
                .get(material)
                .ok_or(AssetError::MaterialNotFound {
                    mesh,
                    primitive: primitive_index,
                    material,
                })?
                .emissive_strength
                > EMISSIVE_LIGHT_THRESHOLD
        }
        None => false,
    };

    physics.insert(
        physics_key(position as u32, index_slot as u32),
        &positions,
        &indices,
        index_accessor,
    )?;

    let slot = |accessor: Option<usize>| accessor.map_or(NO_SLOT, |a| a as i32);
    let mut template = Primitive::empty();
    template.material = slot(primitive.material);
    template.index_buffer = index_slot as i32;
    template.position = position as i32;
    template.tex_coord = slot(primitive.tex_coord);
    template.tangent = slot(primitive.tangent);
    template.normal = slot(primitive.normal);
    template.color = slot(primitive.color);

    Ok(PrimitiveSource {
        template,
        vertex_buffer: buffers[position],
        index_buffer: buffers[index_slot],
        vertex_count: positions.len() as u32,
        index_count: indices.len() as u32,
        emissive,
    })
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Blas(#[from] BlasError),
}
