//! Provider request extractors
//!
//! The set of provider shapes is closed and small, so extractors are a
//! tagged variant rather than trait objects. Each extractor pulls text
//! spans out of the provider-specific JSON, reinserts masked spans by
//! address, and unmasks text-bearing response fields.

use crate::unmasker::{self, UnmaskMode};
use crate::{MaskError, Result};
use promptveil_core::{AddressKey, MaskedSpan, PlaceholderContext, SpanAddress, TextSpan};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderExtractor {
    /// Chat completions: messages[i].content, string or multimodal parts
    ChatCompletions,
    /// Legacy completions: prompt, string or array of strings
    TextCompletions,
}

impl ProviderExtractor {
    /// Pick the extractor for a request body, by shape.
    pub fn for_request(request: &Value) -> Result<Self> {
        let body = request
            .as_object()
            .ok_or_else(|| MaskError::Extraction("request body is not a JSON object".into()))?;

        if body.contains_key("messages") {
            Ok(ProviderExtractor::ChatCompletions)
        } else if body.contains_key("prompt") {
            Ok(ProviderExtractor::TextCompletions)
        } else {
            Err(MaskError::Extraction(
                "expected a messages or prompt field".into(),
            ))
        }
    }

    /// Pull text spans out of the request, in stable document order.
    pub fn extract(&self, request: &Value) -> Vec<TextSpan> {
        match self {
            ProviderExtractor::ChatCompletions => extract_chat(request),
            ProviderExtractor::TextCompletions => extract_prompt(request),
        }
    }

    /// Reinsert masked spans by address. Returns a new request value that
    /// differs only in the extracted text fields.
    pub fn apply(&self, request: &Value, spans: &[MaskedSpan]) -> Result<Value> {
        let mut out = request.clone();
        for span in spans {
            write_text(&mut out, &span.address, &span.text)?;
        }
        Ok(out)
    }

    /// Unmask every text-bearing field of a non-streaming response.
    pub fn unmask_response(
        &self,
        response: &Value,
        context: &PlaceholderContext,
        mode: &UnmaskMode,
    ) -> Value {
        let mut out = response.clone();
        unmasker::unmask_value(&mut out, context, mode);
        out
    }
}

fn extract_chat(request: &Value) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let Some(messages) = request.get("messages").and_then(Value::as_array) else {
        return spans;
    };

    for (i, message) in messages.iter().enumerate() {
        match message.get("content") {
            Some(Value::String(text)) => spans.push(TextSpan {
                address: SpanAddress::root().key("messages").index(i).key("content"),
                text: text.clone(),
            }),
            Some(Value::Array(parts)) => {
                for (j, part) in parts.iter().enumerate() {
                    // Only "text" parts carry maskable content; image and
                    // other part kinds pass through untouched.
                    if part.get("type").and_then(Value::as_str) == Some("text")
                        && let Some(text) = part.get("text").and_then(Value::as_str)
                    {
                        spans.push(TextSpan {
                            address: SpanAddress::root()
                                .key("messages")
                                .index(i)
                                .key("content")
                                .index(j)
                                .key("text"),
                            text: text.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

fn extract_prompt(request: &Value) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    match request.get("prompt") {
        Some(Value::String(text)) => spans.push(TextSpan {
            address: SpanAddress::root().key("prompt"),
            text: text.clone(),
        }),
        Some(Value::Array(prompts)) => {
            for (i, prompt) in prompts.iter().enumerate() {
                if let Some(text) = prompt.as_str() {
                    spans.push(TextSpan {
                        address: SpanAddress::root().key("prompt").index(i),
                        text: text.to_string(),
                    });
                }
            }
        }
        _ => {}
    }
    spans
}

fn write_text(value: &mut Value, address: &SpanAddress, text: &str) -> Result<()> {
    let mut current = value;
    for segment in address.segments() {
        current = match segment {
            AddressKey::Key(key) => current.get_mut(key.as_str()),
            AddressKey::Index(index) => current.get_mut(*index),
        }
        .ok_or_else(|| {
            MaskError::Extraction(format!("address {} no longer resolves", address))
        })?;
    }
    *current = Value::String(text.to_string());
    Ok(())
}
