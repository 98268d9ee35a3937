//! PromptVeil Core Types
//!
//! This crate provides the fundamental types used throughout PromptVeil:
//! - Text spans, detection entities and structural addresses
//! - The per-request placeholder context (a reversible bijection)
//! - The conflict resolver for overlapping detections
//! - Configuration snapshot types
//! - Core error types

pub mod config;
pub mod entity;
pub mod error;
pub mod placeholder;
pub mod resolver;

pub use entity::{AddressKey, Entity, EntitySource, MaskedSpan, SpanAddress, TextSpan};
pub use error::{Error, Result};
pub use placeholder::PlaceholderContext;
