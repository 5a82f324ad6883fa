//! The RGBA raster that flows through every stage.

use serde::{Deserialize, Serialize};

use super::Color;
use crate::error::DegradeError;

/// A rectangular grid of RGBA pixels stored as interleaved bytes.
///
/// The buffer length is always `width * height * 4`. Fields are private so
/// the invariant holds for every value, including deserialized ones.
/// Stages never mutate their input: each one reads a `&RasterImage` and
/// returns a freshly allocated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRaster")]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Unchecked wire shape, validated on the way into [`RasterImage`].
#[derive(Deserialize)]
struct RawRaster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TryFrom<RawRaster> for RasterImage {
    type Error = DegradeError;

    fn try_from(raw: RawRaster) -> Result<Self, Self::Error> {
        RasterImage::new(raw.width, raw.height, raw.pixels)
    }
}

/// Byte length of a `width` x `height` RGBA buffer.
fn buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
}

impl RasterImage {
    /// Wrap an interleaved RGBA buffer.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DegradeError> {
        let expected = buffer_len(width, height).ok_or_else(|| {
            DegradeError::InvalidImageData(format!("{width}x{height} overflows buffer size"))
        })?;
        if pixels.len() != expected {
            return Err(DegradeError::InvalidImageData(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// An image filled with a single color.
    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self, DegradeError> {
        let len = buffer_len(width, height).ok_or_else(|| {
            DegradeError::InvalidImageData(format!("{width}x{height} overflows buffer size"))
        })?;
        let pixels = color.to_bytes().iter().copied().cycle().take(len).collect();
        Self::new(width, height, pixels)
    }

    /// Build an image from one color per pixel, row-major.
    pub fn from_colors(width: u32, height: u32, colors: &[Color]) -> Result<Self, DegradeError> {
        let pixels = colors.iter().flat_map(|c| c.to_bytes()).collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Color at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(Color::from_bytes(bytes))
    }

    /// Iterate pixels in raster order.
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.pixels
            .chunks_exact(4)
            .map(|px| Color::new(px[0], px[1], px[2], px[3]))
    }
}
