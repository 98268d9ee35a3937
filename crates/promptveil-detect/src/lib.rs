//! PromptVeil Detection
//!
//! This crate provides the two detection sources feeding the masking
//! engine:
//! - A regex-driven secret scanner for credential-shaped tokens
//! - An HTTP client adapter over the external PII analyzer

use thiserror::Error;

pub mod analyzer;
pub mod secrets;

pub use analyzer::{AnalyzerClient, AnalyzerConfig, HttpClientConfig, PiiAnalyzer, RetryPolicy};
pub use secrets::SecretScanner;

/// Detection-specific errors
#[derive(Debug, Error)]
pub enum DetectError {
    /// Analyzer could not be reached
    #[error("Analyzer unreachable: {0}")]
    Unavailable(String),

    /// Analyzer returned a non-2xx response
    #[error("Analyzer returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Analyzer returned undecodable or schema-invalid content
    #[error("Analyzer returned malformed content: {0}")]
    Malformed(String),

    /// A scanner pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl DetectError {
    /// Transient failures worth retrying before the error is surfaced.
    pub fn is_retryable(&self) -> bool {
        match self {
            DetectError::Unavailable(_) => true,
            DetectError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Detection result type
pub type Result<T> = std::result::Result<T, DetectError>;

impl From<DetectError> for promptveil_core::Error {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Unavailable(_) | DetectError::Status { .. } => {
                promptveil_core::Error::DetectorUnavailable(err.to_string())
            }
            DetectError::Malformed(_) => {
                promptveil_core::Error::DetectorMalformed(err.to_string())
            }
            DetectError::Pattern(_) => promptveil_core::Error::Internal(err.to_string()),
        }
    }
}
