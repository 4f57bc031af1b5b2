use log::warn;
use rustc_hash::FxHashMap;

use crate::graphics::{
    animation::{AnimChannel, AnimSampler, InterpolationMode, TransformKind},
    asset::{AssetDocument, AssetError, accessor::AccessorView},
};

/// Offset and length of one accessor's data inside a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackSpan {
    pub offset: u32,
    pub count: u32,
}

/// A flat sequence of keyframe data, each accessor appended at most once.
#[derive(Clone, Debug)]
pub struct Track<T> {
    values: Vec<T>,
    spans: FxHashMap<usize, TrackSpan>,
}

impl<T> Default for Track<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            spans: FxHashMap::default(),
        }
    }
}

impl<T> Track<T> {
    /// Get the span of `accessor`, appending the output of `load` if it isn't in the track yet.
    fn ingest<F>(&mut self, accessor: usize, load: F) -> Result<TrackSpan, AssetError>
    where
        F: FnOnce() -> Result<Vec<T>, AssetError>,
    {
        if let Some(span) = self.spans.get(&accessor) {
            return Ok(*span);
        }

        let data = load()?;
        let span = TrackSpan {
            offset: self.values.len() as u32,
            count: data.len() as u32,
        };
        self.values.extend(data);
        self.spans.insert(accessor, span);
        Ok(span)
    }

    /// Get all the values in the track.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Get `count` values starting at `offset`.
    pub fn slice(&self, offset: u32, count: u32) -> &[T] {
        &self.values[offset as usize..(offset + count) as usize]
    }

    /// Number of accessors ingested.
    pub fn accessor_count(&self) -> usize {
        self.spans.len()
    }
}

/// The keyframe data and channel table of every animation in a document.
#[derive(Clone, Debug, Default)]
pub struct AnimationTrackStore {
    times: Track<f32>,
    translations: Track<[f32; 3]>,
    rotations: Track<[f32; 4]>,
    scales: Track<[f32; 3]>,
    channels: Vec<AnimChannel>,
    samplers: Vec<AnimSampler>,
}

impl AnimationTrackStore {
    /// Ingest every translation, rotation and scale channel of `document`.
    ///
    /// Unsupported channels are skipped with a warning. Malformed ones fail the load.
    pub fn load(document: &AssetDocument) -> Result<Self, AssetError> {
        let mut store = Self::default();

        for (animation_index, animation) in document.animations.iter().enumerate() {
            for (channel_index, channel) in animation.channels.iter().enumerate() {
                let Some(kind) = TransformKind::from_path(&channel.target_path) else {
                    warn!(
                        "Skipping channel {channel_index} of animation {animation_index}: \"{}\" channels aren't supported",
                        channel.target_path
                    );
                    continue;
                };
                let Some(node) = channel.target_node else {
                    warn!("Skipping channel {channel_index} of animation {animation_index}: no target node");
                    continue;
                };
                if node >= document.nodes.len() {
                    return Err(AssetError::ChannelTargetOutOfRange {
                        animation: animation_index,
                        channel: channel_index,
                        node,
                        node_count: document.nodes.len(),
                    });
                }

                let sampler = animation.samplers.get(channel.sampler).ok_or(
                    AssetError::SamplerNotFound {
                        animation: animation_index,
                        sampler: channel.sampler,
                    },
                )?;
                let mode = InterpolationMode::from_name(&sampler.interpolation);
                let input = AccessorView::new(document, sampler.input)?;
                let output = AccessorView::new(document, sampler.output)?;
                if !input.component_type().is_float() || !output.component_type().is_float() {
                    warn!(
                        "Skipping channel {channel_index} of animation {animation_index}: keyframes aren't f32"
                    );
                    continue;
                }
                if mode == InterpolationMode::Cubic {
                    warn!(
                        "Sampler {} of animation {animation_index} is cubic spline, evaluating it linearly",
                        channel.sampler
                    );
                }

                let times = store.times.ingest(sampler.input, || input.read::<f32>())?;
                if times.count == 0 {
                    return Err(AssetError::EmptySampler {
                        animation: animation_index,
                        sampler: channel.sampler,
                    });
                }
                let expected = match mode {
                    InterpolationMode::Cubic => times.count as usize * 3,
                    _ => times.count as usize,
                };
                if output.count() < expected {
                    return Err(AssetError::KeyframeCountMismatch {
                        animation: animation_index,
                        sampler: channel.sampler,
                        times: times.count as usize,
                        values: output.count(),
                    });
                }

                let values = match kind {
                    TransformKind::Translation => store
                        .translations
                        .ingest(sampler.output, || output.read::<[f32; 3]>())?,
                    TransformKind::Rotation => store
                        .rotations
                        .ingest(sampler.output, || output.read::<[f32; 4]>())?,
                    TransformKind::Scale => store
                        .scales
                        .ingest(sampler.output, || output.read::<[f32; 3]>())?,
                };

                // Cubic spline outputs are (in-tangent, value, out-tangent) triples.
                let (value_offset, value_stride) = match mode {
                    InterpolationMode::Cubic => (values.offset + 1, 3),
                    _ => (values.offset, 1),
                };
                store.samplers.push(AnimSampler {
                    time_offset: times.offset,
                    value_offset,
                    value_stride,
                    keyframe_count: times.count,
                    mode,
                });
                store.channels.push(AnimChannel {
                    sampler: store.samplers.len() - 1,
                    node,
                    kind,
                });
            }
        }

        Ok(store)
    }

    /// Whether at least one channel was ingested.
    pub fn has_animation(&self) -> bool {
        !self.channels.is_empty()
    }

    /// Get the ingested channels, in document order.
    pub fn channels(&self) -> &[AnimChannel] {
        &self.channels
    }

    /// Get one sampler per ingested channel.
    pub fn samplers(&self) -> &[AnimSampler] {
        &self.samplers
    }

    /// Get the keyframe timestamps of every sampler.
    pub fn times(&self) -> &Track<f32> {
        &self.times
    }

    /// Get the translation keyframe values.
    pub fn translations(&self) -> &Track<[f32; 3]> {
        &self.translations
    }

    /// Get the rotation keyframe values, stored `[x, y, z, w]`.
    pub fn rotations(&self) -> &Track<[f32; 4]> {
        &self.rotations
    }

    /// Get the scale keyframe values.
    pub fn scales(&self) -> &Track<[f32; 3]> {
        &self.scales
    }

    /// Get the value index of keyframe `frame` of `sampler`, in the track of its channel's kind.
    pub fn value_index(&self, sampler: &AnimSampler, frame: usize) -> usize {
        sampler.value_offset as usize + frame * sampler.value_stride as usize
    }

    /// Get the keyframe timestamps of a sampler.
    pub fn sampler_times(&self, sampler: &AnimSampler) -> &[f32] {
        self.times.slice(sampler.time_offset, sampler.keyframe_count)
    }
}
