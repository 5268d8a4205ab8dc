use std::time::Duration;

use marker_overlay_core::DEFAULT_ORIENTATION_CORRECTION_DEG;
use nalgebra::Vector3;

use crate::capability::DetectorConfig;

/// Runtime settings for [`super::OverlayPipeline`].
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    pub detector: DetectorConfig,
    /// Upper bound on the animation delta of a single tick.
    pub max_frame_delta: Duration,
    /// Root position before the first detection, far outside the view.
    pub hidden_position: Vector3<f32>,
    /// Rotation about the marker's local X axis applied after the axis flip.
    pub orientation_correction_deg: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            max_frame_delta: Duration::from_millis(250),
            hidden_position: Vector3::new(1000.0, 0.0, 0.0),
            orientation_correction_deg: DEFAULT_ORIENTATION_CORRECTION_DEG,
        }
    }
}
