//! PromptVeil Masking Engine
//!
//! This crate turns provider requests into scrubbed requests and back:
//! - Provider-specific request extractors (chat and legacy completions)
//! - The span masker (placeholder substitution with whitelist)
//! - The response unmasker (restore and annotate modes)
//! - The masking orchestrator and routing decision

use thiserror::Error;

pub mod extractor;
pub mod masker;
pub mod orchestrator;
pub mod unmasker;

pub use extractor::ProviderExtractor;
pub use orchestrator::{Dispatch, MaskingEngine, MaskingResult};
pub use unmasker::{UnmaskMode, unmask_text, unmask_value};

/// Masking-specific errors
#[derive(Debug, Error)]
pub enum MaskError {
    /// Request did not match any known provider shape
    #[error("Request did not match any known provider shape: {0}")]
    Extraction(String),

    /// A detection source failed
    #[error(transparent)]
    Detect(#[from] promptveil_detect::DetectError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Masking result type
pub type Result<T> = std::result::Result<T, MaskError>;

impl From<MaskError> for promptveil_core::Error {
    fn from(err: MaskError) -> Self {
        match err {
            MaskError::Extraction(msg) => promptveil_core::Error::Extraction(msg),
            MaskError::Detect(inner) => inner.into(),
            MaskError::Serialization(inner) => promptveil_core::Error::Serialization(inner),
            MaskError::Config(msg) => promptveil_core::Error::Config(msg),
        }
    }
}
