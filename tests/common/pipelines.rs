//! Pipeline doubles wrapping the production pipeline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ps1tex::error::PipelineError;
use ps1tex::models::ProcessingParameters;
use ps1tex::services::{DegradePipeline, Pipeline};
use retro_raster::RasterImage;

/// Records the parameters of every run.
#[derive(Default)]
pub struct CountingPipeline {
    runs: Arc<Mutex<Vec<ProcessingParameters>>>,
    inner: DegradePipeline,
}

impl CountingPipeline {
    pub fn new() -> (Self, Arc<Mutex<Vec<ProcessingParameters>>>) {
        let pipeline = Self::default();
        let runs = Arc::clone(&pipeline.runs);
        (pipeline, runs)
    }
}

impl Pipeline for CountingPipeline {
    fn run(
        &self,
        image: &RasterImage,
        params: &ProcessingParameters,
        progress: &mut dyn FnMut(u8),
    ) -> Result<RasterImage, PipelineError> {
        self.runs.lock().unwrap().push(*params);
        self.inner.run(image, params, progress)
    }
}

/// Sleeps on the worker thread before running, optionally only for one
/// resolution.
pub struct SlowPipeline {
    delay: Duration,
    only_resolution: Option<u32>,
    inner: DegradePipeline,
}

impl SlowPipeline {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            only_resolution: None,
            inner: DegradePipeline::new(),
        }
    }

    pub fn only_for(resolution: u32, delay: Duration) -> Self {
        Self {
            only_resolution: Some(resolution),
            ..Self::new(delay)
        }
    }
}

impl Pipeline for SlowPipeline {
    fn run(
        &self,
        image: &RasterImage,
        params: &ProcessingParameters,
        progress: &mut dyn FnMut(u8),
    ) -> Result<RasterImage, PipelineError> {
        if self
            .only_resolution
            .map_or(true, |resolution| resolution == params.resolution)
        {
            std::thread::sleep(self.delay);
        }
        self.inner.run(image, params, progress)
    }
}

/// Panics inside the stage when asked for `resolution`.
pub struct PanicOn {
    pub resolution: u32,
    inner: DegradePipeline,
}

impl PanicOn {
    pub fn resolution(resolution: u32) -> Self {
        Self {
            resolution,
            inner: DegradePipeline::new(),
        }
    }
}

impl Pipeline for PanicOn {
    fn run(
        &self,
        image: &RasterImage,
        params: &ProcessingParameters,
        progress: &mut dyn FnMut(u8),
    ) -> Result<RasterImage, PipelineError> {
        if params.resolution == self.resolution {
            panic!("simulated stage crash");
        }
        self.inner.run(image, params, progress)
    }
}
