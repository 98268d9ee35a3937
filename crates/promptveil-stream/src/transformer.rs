//! Streaming unmasker
//!
//! Layer 2 of the stream transformer. For each text field inside a
//! frame's JSON payload, a rolling carry-over buffer (keyed by frame type
//! and field address) holds back any suffix that may be the beginning of
//! a split placeholder token. The safe prefix is unmasked and emitted;
//! the remainder rides along to the next frame of the same field. On
//! stream termination the carry-over is flushed unchanged, since a
//! still-partial placeholder can no longer be resolved.
//!
//! Every call takes bytes in and returns bytes out; all state lives in
//! explicit fields. Frames are processed and emitted strictly in arrival
//! order.

use crate::error::StreamError;
use crate::sse::{SseFrame, SseFramer};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use promptveil_core::PlaceholderContext;
use promptveil_mask::unmasker::{UnmaskMode, unmask_text};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

const DONE_SENTINEL: &str = "[DONE]";

/// (frame type, JSON-pointer address of the text field)
type FieldKey = (String, String);

/// Skeleton used to synthesize a flush frame for a carried field.
#[derive(Debug, Clone)]
struct FrameTemplate {
    event: Option<String>,
    payload: Value,
}

/// Stateful byte-oriented filter that re-frames an upstream SSE stream
/// and unmasks placeholders without ever cutting one across an emit
/// boundary.
pub struct StreamTransformer {
    framer: SseFramer,
    context: PlaceholderContext,
    mode: UnmaskMode,
    carry: BTreeMap<FieldKey, String>,
    templates: BTreeMap<FieldKey, FrameTemplate>,
    finished: bool,
}

impl StreamTransformer {
    /// The context is request-scoped: it was produced while masking the
    /// outbound request and is consumed here on the return path.
    pub fn new(context: PlaceholderContext, mode: UnmaskMode) -> Self {
        Self {
            framer: SseFramer::new(),
            context,
            mode,
            carry: BTreeMap::new(),
            templates: BTreeMap::new(),
            finished: false,
        }
    }

    /// Feed one upstream chunk; returns the bytes to emit downstream.
    pub fn push(&mut self, chunk: &[u8]) -> Bytes {
        let mut out = String::new();
        for frame in self.framer.push(chunk) {
            out.push_str(&self.transform_frame(&frame));
        }
        Bytes::from(out)
    }

    /// Upstream EOF: flush carried text, then any partial frame as-is.
    pub fn finish(&mut self) -> Bytes {
        let mut out = BytesMut::new();
        if !self.finished {
            out.extend_from_slice(self.flush_frames().as_bytes());
            self.finished = true;
        }
        out.extend_from_slice(&self.framer.take_residual());
        out.freeze()
    }

    /// Upstream error: emit accumulated safe bytes, then an error
    /// terminator frame carrying the failure.
    pub fn fail(&mut self, error: &StreamError) -> Bytes {
        let mut out = String::new();
        if !self.finished {
            out.push_str(&self.flush_frames());
            self.finished = true;
        }
        let body = serde_json::json!({
            "error": { "message": error.to_string(), "type": "stream_error" }
        });
        out.push_str(&format!("data: {}\n\n", body));
        Bytes::from(out)
    }

    fn transform_frame(&mut self, frame: &SseFrame) -> String {
        let event = frame.event().map(str::to_string);
        let mut lines = Vec::with_capacity(frame.lines.len());
        let mut terminated = false;

        for line in &frame.lines {
            let Some(payload) = data_payload(line) else {
                lines.push(line.clone());
                continue;
            };

            if payload.trim() == DONE_SENTINEL {
                terminated = true;
                lines.push(line.clone());
                continue;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(mut value) => {
                    self.rewrite_payload(event.as_deref(), &mut value);
                    lines.push(format!("data: {}", value));
                }
                // Non-JSON payloads pass through untouched.
                Err(_) => lines.push(line.clone()),
            }
        }

        let mut out = String::new();
        if terminated && !self.finished {
            // Residual text must reach the client before the sentinel.
            out.push_str(&self.flush_frames());
            self.finished = true;
        }
        out.push_str(&SseFrame { lines }.to_wire());
        out
    }

    fn rewrite_payload(&mut self, event: Option<&str>, payload: &mut Value) {
        let kind = event
            .or_else(|| payload.get("type").and_then(Value::as_str))
            .or_else(|| payload.get("object").and_then(Value::as_str))
            .unwrap_or("")
            .to_string();

        let context = &self.context;
        let mode = &self.mode;
        let carry = &mut self.carry;
        let mut touched = Vec::new();

        visit_text_fields(payload, &mut String::new(), &mut |path, text| {
            let key = (kind.clone(), path.to_string());
            let combined = match carry.remove(&key) {
                Some(held) => held + text,
                None => std::mem::take(text),
            };

            let (safe, rest) = split_safe(&combined);
            if !rest.is_empty() {
                carry.insert(key, rest.to_string());
            }
            *text = unmask_text(safe, context, mode);
            touched.push(path.to_string());
        });

        if !touched.is_empty() {
            // Remember the frame shape so carried text can be flushed in
            // a well-formed frame at termination.
            let mut skeleton = payload.clone();
            visit_text_fields(&mut skeleton, &mut String::new(), &mut |_, text| {
                text.clear();
            });
            for path in touched {
                self.templates.insert(
                    (kind.clone(), path),
                    FrameTemplate {
                        event: event.map(str::to_string),
                        payload: skeleton.clone(),
                    },
                );
            }
        }
    }

    /// Synthesize one frame per carried field, in deterministic order.
    /// The residual is emitted unchanged: it always starts inside an
    /// unfinished placeholder, so nothing in it can be resolved.
    fn flush_frames(&mut self) -> String {
        let mut out = String::new();
        for ((kind, path), residual) in std::mem::take(&mut self.carry) {
            if residual.is_empty() {
                continue;
            }
            let Some(template) = self.templates.get(&(kind.clone(), path.clone())) else {
                warn!(path = %path, "carried text without a frame template, dropping");
                continue;
            };

            let mut payload = template.payload.clone();
            if let Some(slot) = payload.pointer_mut(&path) {
                *slot = Value::String(residual);
            }

            let mut lines = Vec::new();
            if let Some(event) = &template.event {
                lines.push(format!("event: {}", event));
            }
            lines.push(format!("data: {}", payload));
            out.push_str(&SseFrame { lines }.to_wire());
        }
        out
    }
}

/// Longest prefix containing no incomplete placeholder syntax, and the
/// remainder to carry over. Incomplete means a trailing `[`, or a `[[`
/// that is not yet followed by `]]`.
fn split_safe(s: &str) -> (&str, &str) {
    if let Some(open) = s.rfind("[[")
        && !s[open..].contains("]]")
    {
        return s.split_at(open);
    }
    if s.ends_with('[') && !s.ends_with("[[") {
        return s.split_at(s.len() - 1);
    }
    (s, "")
}

fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:")
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
}

fn is_text_key(key: &str) -> bool {
    matches!(key, "content" | "text")
}

/// Depth-first walk over the payload's text-bearing string fields,
/// building JSON-pointer addresses.
fn visit_text_fields(
    value: &mut Value,
    path: &mut String,
    visit: &mut impl FnMut(&str, &mut String),
) {
    match value {
        Value::Object(fields) => {
            for (key, child) in fields.iter_mut() {
                let len = path.len();
                path.push('/');
                path.push_str(key);
                if let Value::String(text) = child {
                    if is_text_key(key) {
                        visit(path, text);
                    }
                } else {
                    visit_text_fields(child, path, visit);
                }
                path.truncate(len);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                let len = path.len();
                path.push('/');
                path.push_str(&index.to_string());
                visit_text_fields(item, path, visit);
                path.truncate(len);
            }
        }
        _ => {}
    }
}

/// Wrap an upstream SSE byte stream into the client-facing stream with
/// placeholders unmasked.
///
/// Single-consumer and order-preserving: chunks are processed in arrival
/// order and emitted in the same order. Dropping the returned stream
/// cancels consumption of the upstream (client disconnect); an upstream
/// error mid-stream yields the accumulated safe bytes followed by an
/// error terminator frame, then ends the stream.
pub fn unmask_sse_stream<S, E>(upstream: S, transformer: StreamTransformer) -> impl Stream<Item = Bytes>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    struct State<S> {
        upstream: S,
        transformer: StreamTransformer,
        done: bool,
    }

    futures::stream::unfold(
        State {
            upstream,
            transformer,
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }
            match state.upstream.next().await {
                Some(Ok(chunk)) => {
                    let out = state.transformer.push(&chunk);
                    Some((out, state))
                }
                Some(Err(e)) => {
                    let error = StreamError::Upstream(e.to_string());
                    warn!("{}", error);
                    state.done = true;
                    Some((state.transformer.fail(&error), state))
                }
                None => {
                    state.done = true;
                    let out = state.transformer.finish();
                    if out.is_empty() {
                        None
                    } else {
                        Some((out, state))
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_safe_no_brackets() {
        assert_eq!(split_safe("plain text"), ("plain text", ""));
        assert_eq!(split_safe(""), ("", ""));
    }

    #[test]
    fn test_split_safe_complete_placeholder() {
        assert_eq!(split_safe("a [[PERSON_1]] b"), ("a [[PERSON_1]] b", ""));
    }

    #[test]
    fn test_split_safe_open_placeholder() {
        assert_eq!(split_safe("[[PERSO"), ("", "[[PERSO"));
        assert_eq!(split_safe("email [[PERSO"), ("email ", "[[PERSO"));
        assert_eq!(split_safe("x [["), ("x ", "[["));
    }

    #[test]
    fn test_split_safe_trailing_single_bracket() {
        assert_eq!(split_safe("abc["), ("abc", "["));
        assert_eq!(split_safe("x [[A_1]] y["), ("x [[A_1]] y", "["));
    }

    #[test]
    fn test_split_safe_complete_then_open() {
        assert_eq!(
            split_safe("x [[A_1]] y [[B"),
            ("x [[A_1]] y ", "[[B")
        );
    }
}
