//! Error diffusion dithering.
//!
//! Each RGB channel is quantized independently to a fixed number of evenly
//! spaced levels, and the rounding error is pushed onto not-yet-visited
//! neighbors according to a [`Kernel`]. Alpha is copied through untouched.

mod floyd_steinberg;
mod kernel;

pub use floyd_steinberg::{apply_floyd_steinberg, MAX_LEVELS};
pub use kernel::{Kernel, FLOYD_STEINBERG};

use crate::raster::RasterImage;

/// Nearest of `levels` evenly spaced values in `[0, 255]`.
///
/// A single level collapses every value to 0.
#[inline]
pub fn quantize_channel(value: f32, levels: u32) -> f32 {
    if levels <= 1 {
        return 0.0;
    }
    let step = 255.0 / (levels - 1) as f32;
    ((value / step).round() * step).clamp(0.0, 255.0)
}

/// Diffuse per-channel quantization error with `kernel`, raster order.
///
/// Works on a float copy of the input; each neighbor update is clamped to
/// `[0, 255]`. Neighbors outside the image are skipped.
pub(crate) fn diffuse_levels(image: &RasterImage, levels: u32, kernel: &Kernel) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut work: Vec<f32> = image.pixels().iter().map(|&v| v as f32).collect();
    let divisor = kernel.divisor as f32;

    for y in 0..height {
        for x in 0..width {
            let index = (y * width + x) * 4;
            for channel in 0..3 {
                let old = work[index + channel];
                let new = quantize_channel(old, levels);
                work[index + channel] = new;
                let error = old - new;
                if error == 0.0 {
                    continue;
                }

                for &(dx, dy, weight) in kernel.entries {
                    let nx = x as isize + dx as isize;
                    let ny = y + dy as usize;
                    if nx < 0 || nx as usize >= width || ny >= height {
                        continue;
                    }
                    let neighbor = (ny * width + nx as usize) * 4 + channel;
                    work[neighbor] =
                        (work[neighbor] + error * weight as f32 / divisor).clamp(0.0, 255.0);
                }
            }
        }
    }

    work.iter().map(|&v| v.round() as u8).collect()
}
