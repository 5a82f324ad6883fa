//! Error diffusion kernel definitions.

/// An error diffusion kernel.
///
/// Each entry is an `(dx, dy, weight)` offset to a neighbor that has not
/// been processed yet in raster order; the neighbor receives
/// `error * weight / divisor`.
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    /// (dx, dy, weight) entries; `dy` is never negative.
    pub entries: &'static [(i32, i32, u8)],

    /// Total divisor for normalizing weights.
    pub divisor: u8,
}

/// Floyd-Steinberg dithering kernel.
///
/// Distributes error to 4 neighbors with 100% total propagation (16/16).
///
/// ```text
///        X   7
///    3   5   1
/// ```
pub const FLOYD_STEINBERG: Kernel = Kernel {
    entries: &[
        (1, 0, 7),  // right
        (-1, 1, 3), // bottom-left
        (0, 1, 5),  // bottom
        (1, 1, 1),  // bottom-right
    ],
    divisor: 16,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn propagation(kernel: &Kernel) -> f32 {
        let total: u32 = kernel.entries.iter().map(|&(_, _, w)| w as u32).sum();
        total as f32 / kernel.divisor as f32
    }

    #[test]
    fn test_floyd_steinberg_full_propagation() {
        assert!((propagation(&FLOYD_STEINBERG) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_entries_only_reach_forward() {
        for &(dx, dy, _) in FLOYD_STEINBERG.entries {
            assert!(dy > 0 || dx > 0, "({dx}, {dy}) points at a visited pixel");
        }
    }
}
