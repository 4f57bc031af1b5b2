use std::thread;

use log::info;

use crate::graphics::{
    animation::AnimationController,
    asset::AssetDocument,
    gpu::{blas::BlasBuilder, buffer::BufferStore},
    model::{Model, ModelError},
};

/// A model plus its playback state.
pub struct LibraryEntry {
    pub model: Model,
    /// Only animated models get one.
    pub controller: Option<AnimationController>,
}

/// Every model of a scene, loaded together and stepped together.
#[derive(Default)]
pub struct ModelLibrary {
    entries: Vec<LibraryEntry>,
}

impl ModelLibrary {
    /// Load every document on its own worker thread.
    ///
    /// If any load fails, the models that did load are unloaded and the first error is returned.
    pub fn load(
        documents: &[AssetDocument],
        store: &dyn BufferStore,
        blas_builder: &dyn BlasBuilder,
    ) -> Result<Self, ModelError> {
        let results: Vec<Result<Model, ModelError>> = thread::scope(|scope| {
            let handles: Vec<_> = documents
                .iter()
                .map(|document| scope.spawn(move || Model::load(document, store, blas_builder)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut library = Self::default();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(model) => library.push(model),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => {
                library.unload_all(store)?;
                Err(err)
            }
            None => {
                info!("Loaded {} models", library.entries.len());
                Ok(library)
            }
        }
    }

    /// Add an already loaded model.
    pub fn push(&mut self, model: Model) {
        let controller = model.has_animation().then(AnimationController::default);
        self.entries.push(LibraryEntry { model, controller });
    }

    /// Get the loaded models, in document order.
    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    /// Get the loaded models mutably, ie to change their playback.
    pub fn entries_mut(&mut self) -> &mut [LibraryEntry] {
        &mut self.entries
    }

    /// Number of loaded models.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance every animated model by `dt` seconds.
    pub fn update_animations(&mut self, dt: f32) {
        for entry in &mut self.entries {
            if let Some(controller) = &mut entry.controller {
                controller.update(dt, &mut entry.model);
            }
        }
    }

    /// Refit the BLAS of every model that moved since the last call.
    pub fn rebuild_blases(&mut self, store: &dyn BufferStore) -> Result<(), ModelError> {
        for entry in &mut self.entries {
            if let Some(controller) = &mut entry.controller {
                controller.rebuild_model_blas(&mut entry.model, store)?;
            }
        }
        Ok(())
    }

    /// Total number of emissive primitives across all models.
    pub fn emissive_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.model.emissive().len())
            .sum()
    }

    /// Unload every model.
    pub fn unload_all(self, store: &dyn BufferStore) -> Result<(), ModelError> {
        for entry in self.entries {
            entry.model.unload(store)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{
        asset::{DocumentBuilder, Material, Node},
        gpu::buffer::{BufferRegistry, HostMemory},
        test_util::{RecordingBlasBuilder, animated_document, triangle_mesh},
    };
    use pretty_assertions::assert_eq;

    fn emissive_document(name: &str) -> AssetDocument {
        let mut builder = DocumentBuilder::new(name);
        let light = builder.push_material(Material {
            emissive_strength: 10.0,
        });
        let mesh = triangle_mesh(&mut builder, Some(light));
        let node = builder.push_node(Node {
            mesh: Some(mesh),
            ..Default::default()
        });
        builder.push_scene(vec![node]);
        builder.build()
    }

    #[test]
    fn loads_concurrently_and_steps() {
        let registry = BufferRegistry::new(HostMemory);
        let blas_builder = RecordingBlasBuilder::default();
        let documents = vec![
            animated_document(&[0.0, 1.0], &[[0.0; 3], [1.0; 3]], "LINEAR"),
            emissive_document("lamp"),
            emissive_document("other lamp"),
        ];

        let mut library = ModelLibrary::load(&documents, &registry, &blas_builder).unwrap();
        assert_eq!(library.len(), 3);
        assert_eq!(library.emissive_count(), 2);
        assert!(library.entries()[0].controller.is_some());
        assert!(library.entries()[1].controller.is_none());

        library.update_animations(0.1);
        library.rebuild_blases(&registry).unwrap();
        library.rebuild_blases(&registry).unwrap();
        assert_eq!(blas_builder.update_count(), 1);

        library.unload_all(&registry).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn one_failure_unloads_everything() {
        let registry = BufferRegistry::new(HostMemory);
        let mut broken = emissive_document("broken");
        broken.scenes.clear();
        let documents = vec![emissive_document("fine"), broken];

        let result = ModelLibrary::load(&documents, &registry, &RecordingBlasBuilder::default());
        assert!(matches!(result, Err(ModelError::Asset(_))));
        assert!(registry.is_empty());
    }
}
