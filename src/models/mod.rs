pub mod config;
pub mod params;
pub mod protocol;

pub use config::AppConfig;
pub use params::{
    snap_color_depth, snap_resolution, ProcessingParameters, COLOR_DEPTH_LIMITS,
    COLOR_DEPTH_STEPS, PIPELINE_COLOR_DEPTH, PIPELINE_RESOLUTION, RESOLUTION_LIMITS,
    RESOLUTION_STEPS,
};
pub use protocol::{
    ProcessingOutcome, ProcessingStage, ProgressUpdate, RequestId, WorkerRequest, WorkerResponse,
};
