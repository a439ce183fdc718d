use std::path::PathBuf;

use thiserror::Error;

/// Failure at the recognition service boundary
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("recognition request failed: {0}")]
    Network(String),

    #[error("recognition service throttled the request: {0}")]
    Throttled(String),

    #[error("recognition service rejected the credentials: {0}")]
    Auth(String),

    #[error("invalid recognition response: {0}")]
    InvalidResponse(String),

    #[error("failed to read recorded response {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    /// Network failures and throttling may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Network(_) | ServiceError::Throttled(_))
    }
}

/// A shape that cannot be drawn or cropped as given
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{field} = {value} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("polygon has {0} points, at least 3 are required")]
    TooFewPoints(usize),

    #[error("region is empty after clipping to the canvas")]
    EmptyRegion,

    #[error("coordinates are not finite")]
    NonFinite,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("{groups} box groups but {colors} colors")]
    ColorCountMismatch { groups: usize, colors: usize },
}

/// Failure while persisting a run's artifacts
#[derive(Debug, Error)]
pub enum ArtifactWriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to serialize run manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}
