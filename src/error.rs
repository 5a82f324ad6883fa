use retro_raster::DegradeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes reported to callers.
///
/// Cancellation is deliberately absent: it is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidDimensions,
    InvalidTarget,
    InvalidColorCount,
    InvalidImageData,
    /// The worker context itself died.
    WorkerFault,
    UnknownProcessingFailure,
}

impl ErrorKind {
    /// Whether the user can reasonably retry (another file, other settings,
    /// or simply again).
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorKind::UnknownProcessingFailure)
    }

    /// Message shown to the user for this class of failure.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidDimensions | ErrorKind::InvalidImageData => {
                "The image data is invalid. Please try a different image."
            }
            ErrorKind::InvalidTarget => "The selected resolution is not supported.",
            ErrorKind::InvalidColorCount => "The selected color depth is not supported.",
            ErrorKind::WorkerFault => "Failed to process the image. Please try again.",
            ErrorKind::UnknownProcessingFailure => {
                "An unexpected error occurred. Please restart the application."
            }
        }
    }
}

impl From<&DegradeError> for ErrorKind {
    fn from(e: &DegradeError) -> Self {
        match e {
            DegradeError::InvalidDimensions { .. } => ErrorKind::InvalidDimensions,
            DegradeError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            DegradeError::InvalidColorCount { .. } => ErrorKind::InvalidColorCount,
            DegradeError::InvalidImageData(_) => ErrorKind::InvalidImageData,
        }
    }
}

/// Error from a pipeline run: input validation or a failing stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Resolution must be between {min} and {max}, got {value}")]
    ResolutionOutOfRange { value: u32, min: u32, max: u32 },

    #[error("Color depth must be between {min} and {max}, got {value}")]
    ColorDepthOutOfRange { value: u32, min: u32, max: u32 },

    #[error("Image processing failed: {0}")]
    Stage(#[from] DegradeError),

    #[error("Image processing failed: {0}")]
    Unknown(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidDimensions { .. } => ErrorKind::InvalidDimensions,
            PipelineError::ResolutionOutOfRange { .. } => ErrorKind::InvalidTarget,
            PipelineError::ColorDepthOutOfRange { .. } => ErrorKind::InvalidColorCount,
            PipelineError::Stage(e) => ErrorKind::from(e),
            PipelineError::Unknown(_) => ErrorKind::UnknownProcessingFailure,
        }
    }
}

/// Error loading or saving image files.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("PNG encode error: {0}")]
    Encode(String),

    #[error("Invalid image data: {0}")]
    Image(#[from] DegradeError),
}

impl CodecError {
    /// Decode-side failures surface to the pipeline as invalid image data.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Io(_) | CodecError::Encode(_) => ErrorKind::UnknownProcessingFailure,
            _ => ErrorKind::InvalidImageData,
        }
    }
}

/// User-facing description of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: &'static str,
    pub detail: String,
    /// Recoverable notices are dismissible and offer a retry.
    pub recoverable: bool,
}

impl ErrorNotice {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            message: kind.user_message(),
            detail: detail.into(),
            recoverable: kind.is_recoverable(),
        }
    }
}
