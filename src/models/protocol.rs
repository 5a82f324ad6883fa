//! Messages exchanged with the processing worker.
//!
//! The worker is reachable only through these typed messages; no state is
//! shared with it. Every request id receives zero or more `Progress`
//! messages followed by exactly one terminal `Result` or `Error`.

use retro_raster::RasterImage;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ProcessingParameters;
use crate::error::ErrorKind;

/// Identifier of a single processing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `<unix millis>-<9 random alphanumerics>`.
    pub fn generate() -> Self {
        use rand::Rng;
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(9)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(format!("{}-{suffix}", chrono::Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host to worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    Process {
        id: RequestId,
        image: RasterImage,
        params: ProcessingParameters,
    },

    /// Stop the worker without answering anything still queued.
    Terminate,
}

/// Worker to host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerResponse {
    /// Milestone reached, 0-100.
    Progress { id: RequestId, progress: u8 },

    /// Terminal: processed image.
    Result { id: RequestId, image: RasterImage },

    /// Terminal: the pipeline rejected or failed the request.
    Error {
        id: RequestId,
        kind: ErrorKind,
        message: String,
    },
}

impl WorkerResponse {
    pub fn id(&self) -> &RequestId {
        match self {
            WorkerResponse::Progress { id, .. }
            | WorkerResponse::Result { id, .. }
            | WorkerResponse::Error { id, .. } => id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerResponse::Progress { .. })
    }
}

/// Final result of one request, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Success { image: RasterImage },
    Failure { reason: ErrorKind, detail: String },
    Cancelled,
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingOutcome::Success { .. })
    }

    pub fn image(&self) -> Option<&RasterImage> {
        match self {
            ProcessingOutcome::Success { image } => Some(image),
            _ => None,
        }
    }
}

/// Where a request stands in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcessingStage {
    Queued,
    Resizing,
    Quantizing,
    Completed,
}

impl ProcessingStage {
    /// Stage implied by a progress milestone.
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0..=9 => ProcessingStage::Queued,
            10..=29 => ProcessingStage::Resizing,
            30..=99 => ProcessingStage::Quantizing,
            _ => ProcessingStage::Completed,
        }
    }
}

/// Progress notification delivered to a request's observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub id: RequestId,
    pub progress: u8,
    pub stage: ProcessingStage,
}

impl ProgressUpdate {
    pub fn new(id: RequestId, progress: u8) -> Self {
        Self {
            stage: ProcessingStage::from_progress(progress),
            id,
            progress,
        }
    }
}
