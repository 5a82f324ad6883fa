//! Floyd-Steinberg error diffusion to evenly spaced channel levels.

use super::{diffuse_levels, FLOYD_STEINBERG};
use crate::error::DegradeError;
use crate::raster::RasterImage;

/// Largest accepted level count.
pub const MAX_LEVELS: u32 = 256;

/// Dither each RGB channel to `levels` evenly spaced values.
///
/// Pixels are visited row-major, top-to-bottom and left-to-right. For
/// `levels > 1` the step between values is `255 / (levels - 1)`; a single
/// level maps everything to 0. The input is never modified and alpha is
/// copied through unchanged.
///
/// # Errors
///
/// [`DegradeError::InvalidColorCount`] unless `1 <= levels <= 256`.
///
/// # Example
///
/// ```
/// use retro_raster::{apply_floyd_steinberg, Color, RasterImage};
///
/// let image = RasterImage::filled(4, 4, Color::new(128, 128, 128, 200)).unwrap();
/// let dithered = apply_floyd_steinberg(&image, 2).unwrap();
///
/// assert!(dithered.colors().all(|c| (c.r == 0 || c.r == 255) && c.a == 200));
/// ```
pub fn apply_floyd_steinberg(image: &RasterImage, levels: u32) -> Result<RasterImage, DegradeError> {
    if !(1..=MAX_LEVELS).contains(&levels) {
        return Err(DegradeError::InvalidColorCount {
            count: levels,
            min: 1,
            max: MAX_LEVELS,
        });
    }
    if image.is_empty() {
        return Ok(image.clone());
    }

    let pixels = diffuse_levels(image, levels, &FLOYD_STEINBERG);
    RasterImage::new(image.width(), image.height(), pixels)
}
