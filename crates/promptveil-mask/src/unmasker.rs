//! Response unmasking
//!
//! Applies the placeholder bijection in reverse. Every substring matching
//! the placeholder grammar is replaced through the context's forward
//! mapping; placeholders the context never issued are left unchanged.

use promptveil_core::PlaceholderContext;
use promptveil_core::config::MaskingConfig;
use promptveil_core::placeholder::PLACEHOLDER_RE;
use serde_json::Value;

/// How restored values are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmaskMode {
    /// Full restoration (default).
    Restore,
    /// Annotate instead of restoring: "{marker} {original}".
    Annotate { marker: String },
}

impl UnmaskMode {
    pub fn from_config(config: &MaskingConfig) -> Self {
        if config.show_markers {
            UnmaskMode::Annotate {
                marker: config.marker_text.clone(),
            }
        } else {
            UnmaskMode::Restore
        }
    }
}

impl Default for UnmaskMode {
    fn default() -> Self {
        UnmaskMode::Restore
    }
}

/// Replace placeholder tokens in a text through the context.
pub fn unmask_text(text: &str, context: &PlaceholderContext, mode: &UnmaskMode) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let token = &caps[0];
            match context.lookup(token) {
                Some(original) => match mode {
                    UnmaskMode::Restore => original.to_string(),
                    UnmaskMode::Annotate { marker } => format!("{} {}", marker, original),
                },
                // Tokens this context never issued pass through unchanged.
                None => token.to_string(),
            }
        })
        .into_owned()
}

/// Unmask every string leaf of a JSON value in place.
pub fn unmask_value(value: &mut Value, context: &PlaceholderContext, mode: &UnmaskMode) {
    match value {
        Value::String(text) => {
            if text.contains("[[") {
                *text = unmask_text(text, context, mode);
            }
        }
        Value::Array(items) => {
            for item in items {
                unmask_value(item, context, mode);
            }
        }
        Value::Object(fields) => {
            for (_, field) in fields.iter_mut() {
                unmask_value(field, context, mode);
            }
        }
        _ => {}
    }
}
