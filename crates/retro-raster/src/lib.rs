//! retro-raster: low-fidelity texture degradation for RGBA rasters
//!
//! Three independent, synchronous operations turn a photo into a
//! PlayStation-era texture:
//!
//! - [`resize`]: bilinear downscale so the longer side fits a target
//! - [`ColorReducer`]: k-means palette reduction in RGBA space
//! - [`apply_floyd_steinberg`]: per-channel level quantization with
//!   Floyd-Steinberg error diffusion
//!
//! Every operation borrows a [`RasterImage`] and returns a new one. Invalid
//! input yields a [`DegradeError`]; nothing here panics on bad data.
//!
//! # Quick Start
//!
//! ```
//! use retro_raster::{apply_floyd_steinberg, resize, Color, ColorReducer, RasterImage};
//!
//! let photo = RasterImage::filled(640, 480, Color::rgb(90, 120, 200)).unwrap();
//! let small = resize(&photo, 64).unwrap();
//! assert_eq!((small.width(), small.height()), (64, 48));
//!
//! let mut reducer = ColorReducer::new();
//! let reduced = reducer.reduce_colors(&small, 16).unwrap();
//! assert!(reducer.palette().len() <= 16);
//!
//! let dithered = apply_floyd_steinberg(&small, 4).unwrap();
//! assert_eq!(dithered.pixels().len(), reduced.pixels().len());
//! ```
//!
//! # Color distance
//!
//! Palette learning and mapping both use plain Euclidean distance over
//! `(r, g, b, a)`. It is not perceptual: the goal is a period-accurate
//! look, not faithful color reproduction. Ties go to the first palette entry.
//!
//! # Determinism
//!
//! k-means seeding draws from the reducer's RNG. [`ColorReducer::new`] uses
//! a fixed seed, so the same input always yields the same palette;
//! [`ColorReducer::with_rng`] accepts any other source.

pub mod dither;
pub mod error;
pub mod palette;
pub mod preprocess;
pub mod raster;


pub use dither::{apply_floyd_steinberg, Kernel, FLOYD_STEINBERG};
pub use error::DegradeError;
pub use palette::ColorReducer;
pub use preprocess::{calculate_dimensions, resize};
pub use raster::{Color, RasterImage};
