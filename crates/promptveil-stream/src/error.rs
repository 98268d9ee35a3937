//! Error types for the stream transformer

use thiserror::Error;

/// Stream-specific errors
#[derive(Debug, Error)]
pub enum StreamError {
    /// Upstream terminated abnormally mid-stream
    #[error("Upstream stream error: {0}")]
    Upstream(String),

    /// Client disconnected; cancellation is silent
    #[error("Stream aborted: {0}")]
    Aborted(String),
}

/// Stream result type
pub type Result<T> = std::result::Result<T, StreamError>;

impl From<StreamError> for promptveil_core::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Upstream(msg) => promptveil_core::Error::Upstream(msg),
            StreamError::Aborted(msg) => promptveil_core::Error::StreamAborted(msg),
        }
    }
}
