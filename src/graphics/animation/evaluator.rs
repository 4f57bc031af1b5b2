use cgmath::{InnerSpace, Matrix4, Quaternion, SquareMatrix, Vector3, VectorSpace};
use log::trace;

use crate::graphics::{
    animation::{
        AnimChannel, AnimSampler, Interpolation, InterpolationMode, TransformKind,
        tracks::AnimationTrackStore,
    },
    scene::{FlattenedScene, spatial_transform::Decomposed},
};

/// Moves a flattened scene's transforms to a point in time.
#[derive(Clone, Debug)]
pub struct AnimationEvaluator {
    tracks: AnimationTrackStore,
}

impl AnimationEvaluator {
    /// Create an evaluator over the keyframes in `tracks`.
    pub fn new(tracks: AnimationTrackStore) -> Self {
        Self { tracks }
    }

    /// Get the keyframe data.
    pub fn tracks(&self) -> &AnimationTrackStore {
        &self.tracks
    }

    /// Find where `time` falls between the keyframes of `sampler`.
    ///
    /// Time loops over `[0, last keyframe)`. Anything that can't be bracketed
    /// (before the first keyframe, single keyframe) lands on frame 0 with no blend.
    pub fn interpolation(&self, sampler: &AnimSampler, time: f32) -> Interpolation {
        let times = self.tracks.sampler_times(sampler);
        let Some(&last) = times.last() else {
            return Interpolation::default();
        };
        if times.len() < 2 || last <= 0.0 {
            return Interpolation::default();
        }

        let time = time.rem_euclid(last);
        times
            .windows(2)
            .position(|pair| time >= pair[0] && time < pair[1])
            .map(|frame| Interpolation {
                frame,
                factor: (time - times[frame]) / (times[frame + 1] - times[frame]),
            })
            .unwrap_or_default()
    }

    /// Evaluate every channel at `time`, writing the results into `scene`.
    ///
    /// The previous-matrix slots end up holding the matrices from before this call.
    ///
    /// ## Panic
    /// Panics if `scene` wasn't flattened from the document the tracks were loaded from.
    pub fn update(&self, time: f32, scene: &mut FlattenedScene) {
        scene.snapshot_previous();

        for channel in self.tracks.channels() {
            let sampler = &self.tracks.samplers()[channel.sampler];
            let interpolation = self.interpolation(sampler, time);
            let previous = scene.anim_nodes[channel.node].world();

            match self.evaluate(channel, sampler, interpolation, previous) {
                Some(matrix) => propagate(scene, channel.node, previous, matrix),
                None => trace!(
                    "Node {} has an undecomposable matrix, skipping its {:?} channel",
                    channel.node,
                    channel.kind
                ),
            }
        }
    }

    /// Compute a node's new world matrix from the channel value at `interpolation`.
    fn evaluate(
        &self,
        channel: &AnimChannel,
        sampler: &AnimSampler,
        interpolation: Interpolation,
        matrix: Matrix4<f32>,
    ) -> Option<Matrix4<f32>> {
        let Interpolation { frame, factor } = interpolation;
        let left = self.tracks.value_index(sampler, frame);
        let right = self
            .tracks
            .value_index(sampler, (frame + 1).min(sampler.keyframe_count as usize - 1));
        let step = sampler.mode == InterpolationMode::Step;

        match channel.kind {
            TransformKind::Translation => {
                let values = self.tracks.translations().values();
                let translation = lerp_vector(values[left], values[right], factor, step);
                let mut matrix = matrix;
                matrix.w.x = translation.x;
                matrix.w.y = translation.y;
                matrix.w.z = translation.z;
                Some(matrix)
            }
            TransformKind::Rotation => {
                let values = self.tracks.rotations().values();
                let from = quaternion(values[left]);
                let rotation = if step {
                    from.normalize()
                } else {
                    let mut to = quaternion(values[right]);
                    // Shortest path.
                    if from.dot(to) < 0.0 {
                        to = -to;
                    }
                    from.slerp(to, factor).normalize()
                };
                let mut decomposed = Decomposed::from_matrix(&matrix)?;
                decomposed.transform.rotation = rotation;
                Some(decomposed.transform.to_matrix())
            }
            TransformKind::Scale => {
                let values = self.tracks.scales().values();
                let scale = lerp_vector(values[left], values[right], factor, step);
                let mut decomposed = Decomposed::from_matrix(&matrix)?;
                decomposed.transform.scale = scale;
                Some(decomposed.transform.to_matrix())
            }
        }
    }
}

fn lerp_vector(left: [f32; 3], right: [f32; 3], factor: f32, step: bool) -> Vector3<f32> {
    let left = Vector3::from(left);
    if step { left } else { left.lerp(Vector3::from(right), factor) }
}

/// Keyframe rotations are stored `[x, y, z, w]`.
fn quaternion([x, y, z, w]: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(w, x, y, z)
}

/// Give `node` its new matrix, then move every descendant by the same change.
fn propagate(scene: &mut FlattenedScene, node: usize, previous: Matrix4<f32>, matrix: Matrix4<f32>) {
    scene.anim_nodes[node].set_world(matrix);
    for primitive in scene.anim_nodes[node].primitives() {
        scene.set_primitive_model(primitive, matrix);
    }

    let Some(inverse) = previous.invert() else {
        trace!("Node {node} had a singular matrix, not moving its descendants");
        return;
    };
    let delta = matrix * inverse;

    let mut stack = scene.anim_nodes[node].children().to_vec();
    while let Some(child) = stack.pop() {
        let anim_node = &mut scene.anim_nodes[child];
        let world = delta * anim_node.world();
        anim_node.set_world(world);
        let primitives = anim_node.primitives();
        stack.extend_from_slice(anim_node.children());

        for primitive in primitives {
            let model = delta * scene.primitives[primitive].model();
            scene.set_primitive_model(primitive, model);
        }
    }
}
