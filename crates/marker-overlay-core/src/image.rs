/// Bytes per pixel of an interleaved RGB8 frame.
pub const RGB_CHANNELS: usize = 3;

/// Buffer size mismatches between frames, luminance images and incoming data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameSizeError {
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid pixel buffer length (expected {expected} bytes, got {got})")]
    InvalidBufferLength { expected: usize, got: usize },

    #[error(
        "frame is {frame_width}x{frame_height} but luminance image is {luma_width}x{luma_height}"
    )]
    DimensionMismatch {
        frame_width: usize,
        frame_height: usize,
        luma_width: usize,
        luma_height: usize,
    },
}

fn checked_len(width: usize, height: usize, channels: usize) -> Result<usize, FrameSizeError> {
    if width == 0 || height == 0 {
        return Err(FrameSizeError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(FrameSizeError::InvalidDimensions { width, height })
}

#[derive(Clone, Copy, Debug)]
pub struct ColorFrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major RGB, len = w*h*3
}

/// Interleaved RGB8 camera frame.
///
/// The buffer is allocated once for the capture session and refreshed in
/// place afterwards; `data.len() == width * height * 3` always holds.
#[derive(Clone, Debug)]
pub struct ColorFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl ColorFrame {
    /// Allocate a black frame of the given size.
    pub fn new(width: usize, height: usize) -> Result<Self, FrameSizeError> {
        let len = checked_len(width, height, RGB_CHANNELS)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wrap an existing RGB8 buffer.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameSizeError> {
        let expected = checked_len(width, height, RGB_CHANNELS)?;
        if data.len() != expected {
            return Err(FrameSizeError::InvalidBufferLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with a single color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Result<Self, FrameSizeError> {
        let mut frame = Self::new(width, height)?;
        for px in frame.data.chunks_exact_mut(RGB_CHANNELS) {
            px.copy_from_slice(&rgb);
        }
        Ok(frame)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the pixels. The length cannot change.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite the frame contents without reallocating.
    pub fn copy_from_slice(&mut self, pixels: &[u8]) -> Result<(), FrameSizeError> {
        if pixels.len() != self.data.len() {
            return Err(FrameSizeError::InvalidBufferLength {
                expected: self.data.len(),
                got: pixels.len(),
            });
        }
        self.data.copy_from_slice(pixels);
        Ok(())
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * RGB_CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn view(&self) -> ColorFrameView<'_> {
        ColorFrameView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Single-channel `f32` image consumed by the marker detector.
///
/// Samples hold intensities in `[0, 255]`.
#[derive(Clone, Debug)]
pub struct LuminanceImage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl LuminanceImage {
    pub fn new(width: usize, height: usize) -> Result<Self, FrameSizeError> {
        let len = checked_len(width, height, 1)?;
        Ok(Self {
            width,
            height,
            data: vec![0.0; len],
        })
    }

    /// Allocate a luminance image matching `frame`.
    pub fn for_frame(frame: &ColorFrame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            data: vec![0.0; frame.width * frame.height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub(crate) fn ensure_matches(&self, frame: &ColorFrameView<'_>) -> Result<(), FrameSizeError> {
        if self.width != frame.width || self.height != frame.height {
            return Err(FrameSizeError::DimensionMismatch {
                frame_width: frame.width,
                frame_height: frame.height,
                luma_width: self.width,
                luma_height: self.height,
            });
        }
        Ok(())
    }
}
