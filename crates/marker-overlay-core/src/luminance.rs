//! RGB8 to `f32` luminance conversion for the marker detector.
//!
//! Each output sample is the unweighted mean of the three channels. No gamma
//! or perceptual weighting is applied; the detector thresholds locally and
//! tolerates uncalibrated intensity.

use crate::image::{ColorFrameView, FrameSizeError, LuminanceImage, RGB_CHANNELS};

/// Mean of an RGB triple, in `[0, 255]`.
#[inline]
pub fn rgb_mean(r: u8, g: u8, b: u8) -> f32 {
    (r as u16 + g as u16 + b as u16) as f32 / 3.0
}

/// Write the per-pixel channel mean of `frame` into `out`.
///
/// `out` must have the same dimensions as `frame`; it is overwritten in place.
pub fn convert_to_luminance(
    frame: &ColorFrameView<'_>,
    out: &mut LuminanceImage,
) -> Result<(), FrameSizeError> {
    out.ensure_matches(frame)?;
    let expected = frame.width * frame.height * RGB_CHANNELS;
    if frame.data.len() != expected {
        return Err(FrameSizeError::InvalidBufferLength {
            expected,
            got: frame.data.len(),
        });
    }

    for (dst, px) in out
        .data_mut()
        .iter_mut()
        .zip(frame.data.chunks_exact(RGB_CHANNELS))
    {
        *dst = rgb_mean(px[0], px[1], px[2]);
    }
    Ok(())
}
