/// Materials whose emissive strength exceeds this are registered as light-emitting primitives.
pub const EMISSIVE_LIGHT_THRESHOLD: f32 = 1.0;

/// Fixed animation step used by the demo loop (50 Hz).
pub const DEFAULT_FRAME_DELTA: f32 = 1.0 / 50.0;
