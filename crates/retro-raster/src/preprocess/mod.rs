//! Preprocessing applied before color reduction.
//!
//! Currently a single step: downscaling so the longer side matches the
//! requested resolution.

mod resize;

pub use resize::{calculate_dimensions, resize};
