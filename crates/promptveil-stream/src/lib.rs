//! PromptVeil Stream Transformer
//!
//! Re-frames upstream SSE byte streams and unmasks placeholder tokens
//! that may be split across chunk boundaries:
//! - Layer 1: SSE re-framer (complete frames out, partial tail retained)
//! - Layer 2: per-field lookahead unmasker with rolling carry-over
//! - An async adapter wrapping an upstream byte stream

pub mod error;
pub mod sse;
pub mod transformer;

pub use error::{Result, StreamError};
pub use sse::{SseFrame, SseFramer};
pub use transformer::{StreamTransformer, unmask_sse_stream};
