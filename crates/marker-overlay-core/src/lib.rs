//! Core types and algorithms for live marker-based AR overlays.
//!
//! This crate is intentionally small and free of I/O. It knows nothing about
//! capture devices, detectors or renderers; those live behind the capability
//! traits of the `marker-overlay` crate.

mod camera;
mod image;
mod logger;
mod luminance;
mod node;
mod pose;
mod pose_mapper;

pub use camera::{CalibratedCamera, CameraError, PinholeIntrinsics, RadialTangential};
pub use image::{ColorFrame, ColorFrameView, FrameSizeError, LuminanceImage, RGB_CHANNELS};
pub use luminance::{convert_to_luminance, rgb_mean};
pub use node::{SceneNode, TransformNode};
pub use pose::{MarkerPose, TransformComponents, WorldTransform};
pub use pose_mapper::{flip_xy, MappedPose, PoseMapper, DEFAULT_ORIENTATION_CORRECTION_DEG};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{default_filter_directive, init_with_level, level_from_verbosity};
