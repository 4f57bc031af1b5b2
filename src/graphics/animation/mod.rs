pub mod controller;
pub mod evaluator;
pub mod tracks;

pub use controller::AnimationController;
pub use evaluator::AnimationEvaluator;
pub use tracks::AnimationTrackStore;

/// Which part of a node's transform a channel drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    Translation,
    Rotation,
    Scale,
}

impl TransformKind {
    /// Map a channel target path. Returns `None` for unsupported paths (ie `weights`).
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "translation" => Some(Self::Translation),
            "rotation" => Some(Self::Rotation),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }
}

/// How values between two keyframes are computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    /// Hold the left keyframe.
    Step,
    /// Stored, but evaluated like `Linear`.
    Cubic,
}

impl InterpolationMode {
    /// Map a sampler's interpolation name. Anything unknown is `Linear`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "STEP" => Self::Step,
            "CUBICSPLINE" => Self::Cubic,
            _ => Self::Linear,
        }
    }
}

/// A channel driving one component of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimChannel {
    /// Index into the track store's samplers.
    pub sampler: usize,
    /// Index of the target node, in document order.
    pub node: usize,
    pub kind: TransformKind,
}

/// Where a channel's keyframes live in the flat tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimSampler {
    /// Offset into the time track.
    pub time_offset: u32,
    /// Offset of the first keyframe value in the track of the owning channel's kind.
    pub value_offset: u32,
    /// Distance between consecutive keyframe values. 3 for cubic spline triples.
    pub value_stride: u32,
    /// Equal to the number of timestamps.
    pub keyframe_count: u32,
    pub mode: InterpolationMode,
}

/// Position between two keyframes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Interpolation {
    /// The left keyframe, relative to the sampler.
    pub frame: usize,
    /// In `[0, 1)`.
    pub factor: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("LINEAR", InterpolationMode::Linear ; "linear")]
    #[test_case("STEP", InterpolationMode::Step ; "step")]
    #[test_case("CUBICSPLINE", InterpolationMode::Cubic ; "cubic")]
    #[test_case("SMOOTH", InterpolationMode::Linear ; "unknown")]
    fn interpolation_names(name: &str, expected: InterpolationMode) {
        assert_eq!(InterpolationMode::from_name(name), expected);
    }

    #[test]
    fn weights_are_unsupported() {
        assert_eq!(TransformKind::from_path("weights"), None);
        assert_eq!(TransformKind::from_path("scale"), Some(TransformKind::Scale));
    }
}
