//! Bilinear downscaling to a target long side.

use crate::error::DegradeError;
use crate::raster::RasterImage;

/// Dimensions after scaling the longer side down to `target`.
///
/// Images already within `target` keep their dimensions (no upscaling).
/// Otherwise both sides are scaled by `target / max(width, height)` and
/// rounded independently, so the aspect ratio is only approximately kept.
///
/// # Errors
///
/// [`DegradeError::InvalidDimensions`] for a zero side,
/// [`DegradeError::InvalidTarget`] for a zero target.
pub fn calculate_dimensions(
    width: u32,
    height: u32,
    target: u32,
) -> Result<(u32, u32), DegradeError> {
    if width == 0 || height == 0 {
        return Err(DegradeError::InvalidDimensions { width, height });
    }
    if target == 0 {
        return Err(DegradeError::InvalidTarget(target));
    }

    let longer = width.max(height);
    if longer <= target {
        return Ok((width, height));
    }

    let scale = target as f64 / longer as f64;
    let new_width = (width as f64 * scale).round() as u32;
    let new_height = (height as f64 * scale).round() as u32;
    Ok((new_width.max(1), new_height.max(1)))
}

/// Downscale `image` so its longer side is at most `target`.
///
/// Each destination pixel maps to source coordinate `(x * sx, y * sy)`,
/// where `sx = src_w / dst_w`. The four enclosing source pixels are
/// blended per channel (alpha included); neighbors past the right and
/// bottom edges are clamped to the last row/column.
pub fn resize(image: &RasterImage, target: u32) -> Result<RasterImage, DegradeError> {
    let (src_w, src_h) = (image.width(), image.height());
    let (dst_w, dst_h) = calculate_dimensions(src_w, src_h, target)?;

    if dst_w == src_w && dst_h == src_h {
        return Ok(image.clone());
    }

    let src = image.pixels();
    let stride = src_w as usize;
    let scale_x = src_w as f64 / dst_w as f64;
    let scale_y = src_h as f64 / dst_h as f64;
    let mut out = vec![0u8; dst_w as usize * dst_h as usize * 4];

    for y in 0..dst_h as usize {
        let src_y = y as f64 * scale_y;
        let y0 = (src_y.floor() as usize).min(src_h as usize - 1);
        let y1 = (y0 + 1).min(src_h as usize - 1);
        let fy = src_y - y0 as f64;

        for x in 0..dst_w as usize {
            let src_x = x as f64 * scale_x;
            let x0 = (src_x.floor() as usize).min(src_w as usize - 1);
            let x1 = (x0 + 1).min(src_w as usize - 1);
            let fx = src_x - x0 as f64;

            let i00 = (y0 * stride + x0) * 4;
            let i01 = (y0 * stride + x1) * 4;
            let i10 = (y1 * stride + x0) * 4;
            let i11 = (y1 * stride + x1) * 4;
            let target_idx = (y * dst_w as usize + x) * 4;

            for channel in 0..4 {
                let top = src[i00 + channel] as f64 * (1.0 - fx) + src[i01 + channel] as f64 * fx;
                let bottom =
                    src[i10 + channel] as f64 * (1.0 - fx) + src[i11 + channel] as f64 * fx;
                let value = top * (1.0 - fy) + bottom * fy;
                out[target_idx + channel] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    RasterImage::new(dst_w, dst_h, out)
}
