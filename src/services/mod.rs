pub mod coordinator;
pub mod image_processor;
pub mod pipeline;
mod worker;

pub use coordinator::{ProcessingCoordinator, SessionPhase, SessionSnapshot, DEFAULT_DEBOUNCE};
pub use image_processor::{ImageProcessor, ProcessingTicket, WORKER_FAULT_DETAIL};
pub use pipeline::{DegradePipeline, Pipeline};
