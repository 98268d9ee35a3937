//! End-to-end integration tests for PromptVeil
//!
//! These tests wire the analyzer client, the masking engine and the
//! stream transformer together to verify the full mask/unmask flow a
//! proxy front-end would drive.
