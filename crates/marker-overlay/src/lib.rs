//! Live camera AR overlay: place a 3D model on a printed fiducial marker.
//!
//! This crate provides:
//! - capability traits for the camera, marker detector, background renderer
//!   and scene (`capability`),
//! - the single-threaded per-tick pipeline that keeps video, detection and
//!   animation in step (`pipeline`),
//! - JSON / YAML configuration and calibration loading (`config`),
//! - (feature `replay`) a headless harness that runs recorded frames and
//!   detections through the real pipeline.
//!
//! ## Quickstart
//!
//! ```no_run
//! use marker_overlay::config::OverlayConfig;
//! use marker_overlay::replay::{run_replay, ScriptedDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = OverlayConfig::load("overlay.json")?;
//! let detector = ScriptedDetector::load_json("detections.json")?;
//! let frames = vec!["frame_000.png".into(), "frame_001.png".into()];
//! let report = run_replay(&cfg, frames, detector)?;
//! println!("poses applied: {}", report.poses_applied);
//! # Ok(())
//! # }
//! ```
//!
//! ## Tick order
//!
//! 1. clear color + depth, draw the background quad with the current texture;
//! 2. if the camera has a new frame: upload it, convert to luminance, detect,
//!    and map detection 0 onto the model root;
//! 3. advance the scene by the clamped wall-clock delta and refresh the root;
//! 4. clear depth only and draw the scene over the video.

pub mod capability;
pub mod config;
pub mod pipeline;

#[cfg(feature = "replay")]
pub mod replay;

pub use marker_overlay_core as core;

pub use capability::{
    CaptureError, ClearMask, DetectorConfig, FrameSource, MarkerDetector, RenderTarget,
    Resolution, Scene, ThresholdStrategy,
};
pub use config::{ConfigError, OverlayConfig};
pub use marker_overlay_core::{
    CalibratedCamera, ColorFrame, LuminanceImage, MarkerPose, PoseMapper, SceneNode,
    TransformComponents, TransformNode, WorldTransform,
};
pub use pipeline::{
    OverlayPipeline, PipelineSettings, PipelineState, StartupError, TickError, TickReport,
};
