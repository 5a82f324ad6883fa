//! Error type shared by every raster operation.
//!
//! All operations validate their inputs up front and fail synchronously
//! with a [`DegradeError`]; none of them panic on bad input.

use thiserror::Error;

/// Unified error type for the retro-raster public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DegradeError {
    /// Width or height is zero.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Resize target (longer side) is zero.
    #[error("Invalid target size: {0}")]
    InvalidTarget(u32),

    /// Palette size or dither level count outside its accepted range.
    #[error("Color count must be between {min} and {max}, got {count}")]
    InvalidColorCount { count: u32, min: u32, max: u32 },

    /// Pixel buffer does not match the declared dimensions.
    #[error("Invalid image data: {0}")]
    InvalidImageData(String),
}
