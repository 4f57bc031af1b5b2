use crate::graphics::{
    gpu::buffer::BufferStore,
    model::{Model, ModelError},
};

/// Playback state for one animated model.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationController {
    speed: f32,
    time_offset: f32,
    paused: bool,
    time: f32,
    dirty: bool,
}

impl Default for AnimationController {
    fn default() -> Self {
        Self {
            speed: 1.0,
            time_offset: 0.0,
            paused: false,
            time: 0.0,
            dirty: false,
        }
    }
}

impl AnimationController {
    /// Start at `time_offset` seconds into the animation, played at `speed`.
    pub fn new(speed: f32, time_offset: f32) -> Self {
        Self {
            speed,
            time_offset,
            ..Default::default()
        }
    }

    /// Advance by `dt` seconds and move the model's transforms accordingly.
    pub fn update(&mut self, dt: f32, model: &mut Model) {
        if self.paused || self.speed == 0.0 {
            return;
        }
        self.time += self.speed * dt;
        model.update_animations(self.time_offset + self.time);
        self.dirty = true;
    }

    /// Refit the model's BLAS if its transforms moved since the last refit.
    pub fn rebuild_model_blas(
        &mut self,
        model: &mut Model,
        store: &dyn BufferStore,
    ) -> Result<(), ModelError> {
        if self.dirty {
            model.rebuild_blas(store)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Get the playback speed multiplier.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Get the time the animation starts at.
    pub fn time_offset(&self) -> f32 {
        self.time_offset
    }

    pub fn set_time_offset(&mut self, time_offset: f32) {
        self.time_offset = time_offset;
    }

    /// Whether playback is paused.
    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Time played so far, not counting the offset.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Whether the model moved since the last refit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{
        gpu::buffer::{BufferRegistry, HostMemory},
        test_util::{RecordingBlasBuilder, animated_document, assert_matrix_eq},
    };
    use cgmath::{Matrix4, Vector3};

    #[test]
    fn speed_and_offset_scale_time() {
        let registry = BufferRegistry::new(HostMemory);
        let blas_builder = RecordingBlasBuilder::default();
        let document = animated_document(&[0.0, 4.0], &[[0.0; 3], [4.0, 0.0, 0.0]], "LINEAR");
        let mut model = Model::load(&document, &registry, &blas_builder).unwrap();

        let mut controller = AnimationController::new(2.0, 1.0);
        controller.update(0.5, &mut model);
        assert_eq!(controller.time(), 1.0);
        assert!(controller.is_dirty());
        // 1.0 offset + 0.5 * 2.0
        assert_matrix_eq(
            &model.primitives()[0].model(),
            &Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0)),
        );

        controller.rebuild_model_blas(&mut model, &registry).unwrap();
        controller.rebuild_model_blas(&mut model, &registry).unwrap();
        assert_eq!(blas_builder.update_count(), 1);
        assert!(!controller.is_dirty());
    }

    #[test]
    fn paused_does_nothing() {
        let registry = BufferRegistry::new(HostMemory);
        let blas_builder = RecordingBlasBuilder::default();
        let document = animated_document(&[0.0, 1.0], &[[0.0; 3], [1.0; 3]], "LINEAR");
        let mut model = Model::load(&document, &registry, &blas_builder).unwrap();

        let mut controller = AnimationController::default();
        controller.set_paused(true);
        controller.update(0.5, &mut model);
        assert_eq!(controller.time(), 0.0);
        assert!(!controller.is_dirty());

        controller.set_paused(false);
        controller.set_speed(0.0);
        controller.update(0.5, &mut model);
        assert!(!controller.is_dirty());

        controller.rebuild_model_blas(&mut model, &registry).unwrap();
        assert_eq!(blas_builder.update_count(), 0);
    }
}
