//! Error types for PromptVeil Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request did not match any known provider shape: {0}")]
    Extraction(String),

    #[error("PII analyzer unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("PII analyzer returned malformed content: {0}")]
    DetectorMalformed(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Stream aborted: {0}")]
    StreamAborted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status the front-end should surface for this error.
    ///
    /// Detector failures are server-side faults and must never cause the
    /// request to be forwarded unmasked; extraction failures are the
    /// client's fault.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Extraction(_) | Error::Serialization(_) => 400,
            Error::DetectorUnavailable(_) => 502,
            Error::DetectorMalformed(_) => 502,
            Error::Upstream(_) => 502,
            Error::StreamAborted(_) => 499,
            Error::Config(_) | Error::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
