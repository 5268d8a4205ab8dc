use serde::{Deserialize, Serialize};

/// What happened during one tick.
///
/// A missing frame or a missed detection is reported here, not as an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    /// A new camera frame was uploaded and run through detection.
    pub frame_updated: bool,
    /// Markers reported by the detector; zero when no frame arrived.
    pub markers_found: usize,
    /// The root node received a new pose this tick.
    pub pose_applied: bool,
    /// Animation delta in seconds after clamping.
    pub delta_s: f32,
}
