//! Core value types: the RGBA raster and its color entries.

mod color;
mod image;

pub use color::Color;
pub use image::RasterImage;
