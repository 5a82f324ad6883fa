//! Color reduction: palette learning and nearest-color mapping.

mod reducer;

pub use reducer::{ColorReducer, DEFAULT_SEED, MAX_COLORS, MAX_ITERATIONS};
