//! SSE re-framing
//!
//! Layer 1 of the stream transformer. Accumulates upstream bytes and
//! emits complete frames as soon as the blank-line terminator is seen;
//! the trailing partial frame is retained across calls. Frames are never
//! reordered.

use bytes::{Bytes, BytesMut};

/// One complete SSE frame, excluding its terminating blank line.
///
/// Lines are stored without their line endings; `\r\n` is normalized
/// to `\n` on re-serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub lines: Vec<String>,
}

impl SseFrame {
    fn parse(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self { lines }
    }

    /// The `event:` field, if the frame carries one.
    pub fn event(&self) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            line.strip_prefix("event:")
                .map(|value| value.strip_prefix(' ').unwrap_or(value))
        })
    }

    /// Serialize the frame back to wire form, including the terminator.
    pub fn to_wire(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push_str("\n\n");
        out
    }
}

/// Byte-buffer re-framer. Push bytes in, get complete frames out.
#[derive(Debug, Default)]
pub struct SseFramer {
    buffer: BytesMut,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns all newly completed frames in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((body_len, consumed)) = find_terminator(&self.buffer) {
            let body = self.buffer.split_to(consumed);
            frames.push(SseFrame::parse(&body[..body_len]));
        }
        frames
    }

    /// Any retained partial frame, as raw bytes. Only meaningful at EOF.
    pub fn take_residual(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}

/// Find the first frame terminator: a line ending followed by a blank
/// line. Returns (frame body length, bytes consumed including the
/// terminator).
fn find_terminator(buffer: &[u8]) -> Option<(usize, usize)> {
    for (i, byte) in buffer.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        match buffer.get(i + 1) {
            Some(b'\n') => return Some((i, i + 2)),
            Some(b'\r') if buffer.get(i + 2) == Some(&b'\n') => return Some((i, i + 3)),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut framer = SseFramer::new();
        let frames = framer.push(b"data: {\"a\":1}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].lines, vec!["data: {\"a\":1}"]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut framer = SseFramer::new();
        assert!(framer.push(b"data: hel").is_empty());
        assert!(framer.push(b"lo\n").is_empty());
        let frames = framer.push(b"\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].lines, vec!["data: hello"]);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut framer = SseFramer::new();
        let frames = framer.push(b"data: one\n\ndata: two\n\ndata: thr");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].lines, vec!["data: one"]);
        assert_eq!(frames[1].lines, vec!["data: two"]);

        let frames = framer.push(b"ee\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].lines, vec!["data: three"]);
    }

    #[test]
    fn test_crlf_terminators() {
        let mut framer = SseFramer::new();
        let frames = framer.push(b"event: delta\r\ndata: x\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].lines, vec!["event: delta", "data: x"]);
        assert_eq!(frames[0].event(), Some("delta"));
    }

    #[test]
    fn test_multi_line_frame() {
        let mut framer = SseFramer::new();
        let frames = framer.push(b"event: message\nid: 3\ndata: payload\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].lines,
            vec!["event: message", "id: 3", "data: payload"]
        );
    }

    #[test]
    fn test_residual() {
        let mut framer = SseFramer::new();
        framer.push(b"data: done\n\ndata: partial");
        assert_eq!(&framer.take_residual()[..], b"data: partial");
        assert!(framer.take_residual().is_empty());
    }

    #[test]
    fn test_to_wire_round_trip() {
        let mut framer = SseFramer::new();
        let wire = "event: delta\ndata: {\"x\":1}\n\n";
        let frames = framer.push(wire.as_bytes());
        assert_eq!(frames[0].to_wire(), wire);
    }
}
