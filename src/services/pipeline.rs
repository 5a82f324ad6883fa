//! The degradation pipeline: resize, then dither or reduce colors.

use retro_raster::palette::DEFAULT_SEED;
use retro_raster::{apply_floyd_steinberg, resize, ColorReducer, RasterImage};

use crate::error::PipelineError;
use crate::models::{ProcessingParameters, PIPELINE_COLOR_DEPTH, PIPELINE_RESOLUTION};

/// Progress milestones emitted by [`DegradePipeline`].
pub const PROGRESS_STARTED: u8 = 10;
pub const PROGRESS_RESIZED: u8 = 30;
pub const PROGRESS_QUANTIZED: u8 = 60;
pub const PROGRESS_DONE: u8 = 100;

/// A synchronous image transformation run on the worker thread.
///
/// `progress` receives milestones in the range 0-100. Implementations must
/// report an `Err` rather than panic for bad input; a panic takes the whole
/// worker down.
pub trait Pipeline: Send + Sync {
    fn run(
        &self,
        image: &RasterImage,
        params: &ProcessingParameters,
        progress: &mut dyn FnMut(u8),
    ) -> Result<RasterImage, PipelineError>;
}

/// Production pipeline.
#[derive(Debug, Clone)]
pub struct DegradePipeline {
    seed: u64,
}

impl DegradePipeline {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Pipeline whose k-means seeding starts from `seed` on every run.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Reject bad requests before any stage runs.
    pub fn validate(
        image: &RasterImage,
        params: &ProcessingParameters,
    ) -> Result<(), PipelineError> {
        if image.is_empty() {
            return Err(PipelineError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }
        if !PIPELINE_RESOLUTION.contains(&params.resolution) {
            return Err(PipelineError::ResolutionOutOfRange {
                value: params.resolution,
                min: *PIPELINE_RESOLUTION.start(),
                max: *PIPELINE_RESOLUTION.end(),
            });
        }
        if !PIPELINE_COLOR_DEPTH.contains(&params.color_depth) {
            return Err(PipelineError::ColorDepthOutOfRange {
                value: params.color_depth,
                min: *PIPELINE_COLOR_DEPTH.start(),
                max: *PIPELINE_COLOR_DEPTH.end(),
            });
        }
        Ok(())
    }
}

impl Default for DegradePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline for DegradePipeline {
    fn run(
        &self,
        image: &RasterImage,
        params: &ProcessingParameters,
        progress: &mut dyn FnMut(u8),
    ) -> Result<RasterImage, PipelineError> {
        Self::validate(image, params)?;

        progress(PROGRESS_STARTED);
        let resized = resize(image, params.resolution)?;
        tracing::debug!(
            from_width = image.width(),
            from_height = image.height(),
            width = resized.width(),
            height = resized.height(),
            "Resized image"
        );
        progress(PROGRESS_RESIZED);

        let output = if params.dithering {
            apply_floyd_steinberg(&resized, params.color_depth)?
        } else {
            let mut reducer = ColorReducer::seeded(self.seed);
            let reduced = reducer.reduce_colors(&resized, params.color_depth)?;
            tracing::debug!(palette_size = reducer.palette().len(), "Reduced colors");
            reduced
        };
        progress(PROGRESS_QUANTIZED);
        progress(PROGRESS_DONE);

        Ok(output)
    }
}
