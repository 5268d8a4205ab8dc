use std::time::Duration;

use marker_overlay_core::{ColorFrame, FrameSizeError, LuminanceImage, WorldTransform};
use nalgebra::Vector3;

use super::FrameClock;

/// Everything the render loop mutates between ticks.
///
/// The frame and luminance buffers are allocated once for the capture session
/// and overwritten in place. `world` holds the last applied marker transform,
/// which stays in place on ticks without a detection.
#[derive(Clone, Debug)]
pub struct PipelineState {
    pub(crate) frame: ColorFrame,
    pub(crate) luminance: LuminanceImage,
    pub(crate) world: WorldTransform,
    pub(crate) clock: FrameClock,
    pub(crate) ticks: u64,
    pub(crate) frames_processed: u64,
    pub(crate) poses_applied: u64,
}

impl PipelineState {
    pub fn new(
        width: usize,
        height: usize,
        hidden_position: Vector3<f32>,
        max_frame_delta: Duration,
    ) -> Result<Self, FrameSizeError> {
        let frame = ColorFrame::new(width, height)?;
        let luminance = LuminanceImage::for_frame(&frame);
        Ok(Self {
            frame,
            luminance,
            world: WorldTransform::from_translation(hidden_position),
            clock: FrameClock::new(max_frame_delta),
            ticks: 0,
            frames_processed: 0,
            poses_applied: 0,
        })
    }

    /// The session's color frame as last read from the camera.
    pub fn frame(&self) -> &ColorFrame {
        &self.frame
    }

    pub fn luminance(&self) -> &LuminanceImage {
        &self.luminance
    }

    /// Last applied marker world transform, or the hidden placement.
    pub fn world(&self) -> &WorldTransform {
        &self.world
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn poses_applied(&self) -> u64 {
        self.poses_applied
    }
}
