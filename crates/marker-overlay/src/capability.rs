//! Capability traits for the collaborators the pipeline drives but does not own.
//!
//! Capture devices, marker detectors and renderers are swapped in behind these
//! traits; the pipeline, pose mapping and synchronization logic never see a
//! concrete implementation.

use marker_overlay_core::{
    CalibratedCamera, ColorFrame, FrameSizeError, LuminanceImage, MarkerPose, TransformNode,
};
use serde::{Deserialize, Serialize};

/// Capture resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Errors raised by a capture device.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("capture device error: {0}")]
    Device(String),
    #[error("resolution {}x{} is not supported", .0.width, .0.height)]
    UnsupportedResolution(Resolution),
    #[error(transparent)]
    Frame(#[from] FrameSizeError),
}

/// A camera producing RGB8 frames.
///
/// Devices may refresh their internal buffer from another thread; callers
/// only rely on the flag-then-copy handoff of `has_new_frame` followed by
/// `read_frame`.
pub trait FrameSource {
    /// Resolutions the device can deliver. Empty means no usable device.
    fn supported_resolutions(&self) -> Vec<Resolution>;

    /// Start capturing at `resolution`. Called once before the render loop.
    fn open(&mut self, resolution: Resolution) -> Result<(), CaptureError>;

    /// `true` when a frame newer than the last `read_frame` is available.
    fn has_new_frame(&self) -> bool;

    /// Copy the latest frame into `frame` without reallocating it.
    fn read_frame(&mut self, frame: &mut ColorFrame) -> Result<(), CaptureError>;

    /// Release the device. Default is a no-op.
    fn close(&mut self) {}
}

/// Binarization strategy handed to the detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdStrategy {
    /// Mean of a square window of side `radius`.
    LocalMean { radius: u32 },
    /// Global threshold on the luminance value.
    Fixed { value: f32 },
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self::LocalMean { radius: 21 }
    }
}

fn default_marker_size() -> f64 {
    1.0
}

/// Static detector configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Physical side length of the printed marker, in world units.
    #[serde(default = "default_marker_size")]
    pub marker_size: f64,
    #[serde(default)]
    pub threshold: ThresholdStrategy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            marker_size: default_marker_size(),
            threshold: ThresholdStrategy::default(),
        }
    }
}

/// Square fiducial detector returning marker-to-camera poses.
pub trait MarkerDetector {
    fn configure(&mut self, config: &DetectorConfig);

    /// Provide the lens model and the image size it was calibrated at.
    fn set_lens_distortion(&mut self, camera: &CalibratedCamera, width: u32, height: u32);

    /// Run detection and return the number of markers found.
    fn detect(&mut self, image: &LuminanceImage) -> usize;

    /// Whether detection `index` carries a well-posed 3D transform.
    fn is_3d(&self, index: usize) -> bool;

    /// Marker-to-camera transform of detection `index`.
    fn marker_to_camera(&self, index: usize) -> Option<MarkerPose>;
}

/// Which buffers to clear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearMask {
    ColorAndDepth,
    DepthOnly,
}

/// The background half of rendering: clears, texture upload and the video quad.
pub trait RenderTarget {
    fn clear(&mut self, mask: ClearMask);

    /// Replace the background texture's pixels with `frame`.
    fn upload_background(&mut self, frame: &ColorFrame);

    /// Draw the full-screen quad sampling the background texture.
    fn draw_background(&mut self);

    /// Texture coordinate sampled at quad coordinate `(u, v)`.
    ///
    /// Camera rows arrive top-down, so V is flipped.
    fn background_uv(&self, u: f32, v: f32) -> [f32; 2] {
        [u, 1.0 - v]
    }

    /// Clip-space quad corners as `[x, y, s, t]`, triangle-strip order.
    fn background_quad(&self) -> [[f32; 4]; 4] {
        [
            [-1.0, -1.0, 0.0, 0.0],
            [1.0, -1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0, 1.0],
        ]
        .map(|[x, y, u, v]| {
            let [s, t] = self.background_uv(u, v);
            [x, y, s, t]
        })
    }
}

/// The model half of rendering: node hierarchy, animation and draw.
pub trait Scene {
    type Root: TransformNode;

    fn root(&self) -> &Self::Root;

    fn root_mut(&mut self) -> &mut Self::Root;

    /// Advance animation and scene state by `dt` seconds.
    fn advance(&mut self, dt: f32);

    fn render(&mut self);
}
