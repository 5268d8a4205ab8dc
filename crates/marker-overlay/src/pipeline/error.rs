use crate::capability::CaptureError;
use crate::config::ConfigError;
use marker_overlay_core::FrameSizeError;

/// Fatal errors before the render loop starts.
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("no capture device available")]
    NoCaptureDevice,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("failed to load calibration: {0}")]
    Calibration(#[from] ConfigError),
    #[error(transparent)]
    Frame(#[from] FrameSizeError),
}

/// Errors inside a tick. The loop has no recovery path; callers propagate them.
#[derive(thiserror::Error, Debug)]
pub enum TickError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Frame(#[from] FrameSizeError),
}
