use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Bounds the raw algorithms accept for the resize target.
pub const RESOLUTION_LIMITS: RangeInclusive<u32> = 16..=1024;

/// Bounds the raw algorithms accept for the color count.
pub const COLOR_DEPTH_LIMITS: RangeInclusive<u32> = 2..=256;

/// Resize targets the processing pipeline accepts.
///
/// Narrower than [`RESOLUTION_LIMITS`]; this is the authoritative range for
/// every pipeline run.
pub const PIPELINE_RESOLUTION: RangeInclusive<u32> = 32..=512;

/// Color counts the processing pipeline accepts.
pub const PIPELINE_COLOR_DEPTH: RangeInclusive<u32> = 4..=256;

/// Resolution slider steps. Every step lies inside [`PIPELINE_RESOLUTION`].
pub const RESOLUTION_STEPS: [u32; 7] = [32, 48, 64, 96, 128, 256, 512];

/// Color depth slider steps. Every step lies inside [`PIPELINE_COLOR_DEPTH`].
pub const COLOR_DEPTH_STEPS: [u32; 8] = [4, 8, 16, 24, 32, 64, 128, 256];

/// Parameters of a single processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingParameters {
    /// Target length of the longer side, in pixels.
    pub resolution: u32,
    /// Palette size, or channel levels when dithering.
    pub color_depth: u32,
    /// Dither instead of k-means reduction.
    pub dithering: bool,
}

impl ProcessingParameters {
    pub const fn new(resolution: u32, color_depth: u32, dithering: bool) -> Self {
        Self {
            resolution,
            color_depth,
            dithering,
        }
    }

    /// Whether both values lie inside the raw component bounds
    /// ([`RESOLUTION_LIMITS`], [`COLOR_DEPTH_LIMITS`]).
    pub fn within_limits(&self) -> bool {
        RESOLUTION_LIMITS.contains(&self.resolution)
            && COLOR_DEPTH_LIMITS.contains(&self.color_depth)
    }

    /// Parameters with resolution and color depth snapped to slider steps.
    pub fn snapped(resolution: u32, color_depth: u32, dithering: bool) -> Self {
        Self::new(
            snap_resolution(resolution),
            snap_color_depth(color_depth),
            dithering,
        )
    }
}

impl Default for ProcessingParameters {
    fn default() -> Self {
        Self::new(256, 16, false)
    }
}

/// Nearest resolution step; ties go to the lower step.
pub fn snap_resolution(value: u32) -> u32 {
    snap_to(&RESOLUTION_STEPS, value)
}

/// Nearest color depth step; ties go to the lower step.
pub fn snap_color_depth(value: u32) -> u32 {
    snap_to(&COLOR_DEPTH_STEPS, value)
}

fn snap_to(steps: &[u32], value: u32) -> u32 {
    steps
        .iter()
        .copied()
        .min_by_key(|step| step.abs_diff(value))
        .unwrap_or(value)
}
