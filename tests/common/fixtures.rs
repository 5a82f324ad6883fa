//! Test images.

use retro_raster::{Color, RasterImage};

pub const RED: Color = Color::rgb(255, 0, 0);
pub const GREEN: Color = Color::rgb(0, 255, 0);
pub const BLUE: Color = Color::rgb(0, 0, 255);
pub const WHITE: Color = Color::rgb(255, 255, 255);

/// Square image with red, green, blue and white quadrants
/// (top-left, top-right, bottom-left, bottom-right).
pub fn quadrants(size: u32) -> RasterImage {
    let half = size / 2;
    let colors: Vec<Color> = (0..size)
        .flat_map(|y| {
            (0..size).map(move |x| match (x < half, y < half) {
                (true, true) => RED,
                (false, true) => GREEN,
                (true, false) => BLUE,
                (false, false) => WHITE,
            })
        })
        .collect();
    RasterImage::from_colors(size, size, &colors).unwrap()
}

/// Smooth RGB gradient with many distinct colors.
pub fn gradient(width: u32, height: u32) -> RasterImage {
    let colors: Vec<Color> = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                Color::rgb(
                    (x * 255 / width.max(1)) as u8,
                    (y * 255 / height.max(1)) as u8,
                    ((x + y) * 127 / (width + height).max(1)) as u8,
                )
            })
        })
        .collect();
    RasterImage::from_colors(width, height, &colors).unwrap()
}
