// THEORY:
// A `Frame` is the immutable unit of work handed from the capture side to the
// detection side. It wraps an `image::RgbImage` so that any decoder or camera
// binding that produces the `image` crate's buffers can feed the pipeline
// without copying.
//
// The `HsvFrame` is the same grid converted once into the working color space.
// Every color profile evaluated against a frame reads this shared conversion,
// so adding a profile costs one range test per pixel, not another conversion.

use crate::core_modules::pixel::HsvPixel;
use crate::error::{Result, VisionError};
use image::RgbImage;
use std::time::Instant;

/// A captured RGB frame plus its capture metadata.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    /// Monotonic counter assigned by the frame source.
    pub sequence: u64,
    /// When the frame was captured.
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    /// Builds a frame from a packed RGB24 buffer.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        let actual = data.len();
        let image = RgbImage::from_raw(width, height, data)
            .ok_or(VisionError::InvalidFrame { expected, actual })?;
        Ok(Self::new(image))
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// A frame converted into HSV, row-major.
#[derive(Debug, Clone)]
pub struct HsvFrame {
    pub width: u32,
    pub height: u32,
    pixels: Vec<HsvPixel>,
}

impl HsvFrame {
    /// Converts every pixel of `frame` once.
    pub fn from_frame(frame: &Frame) -> Self {
        let pixels = frame
            .image()
            .pixels()
            .map(|rgb| HsvPixel::from(rgb.0))
            .collect();
        Self {
            width: frame.width(),
            height: frame.height(),
            pixels,
        }
    }

    /// Wraps already-converted pixels; `None` if the length does not match.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<HsvPixel>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn pixels(&self) -> &[HsvPixel] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<HsvPixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get((y as usize) * self.width as usize + x as usize)
            .copied()
    }
}
