use serde_json::json;

/// One classified line from an upstream event stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StreamFrame {
    Data(String),
    Done,
}

/// Incremental newline-delimited decoder over raw upstream byte chunks.
///
/// Bytes are buffered until a full line is present, so a chunk boundary in
/// the middle of a line (including the middle of a multi-byte UTF-8
/// sequence) never splits a frame: `\n` cannot occur inside a multi-byte
/// sequence, and only complete lines are ever decoded.
#[derive(Debug, Default)]
pub(crate) struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            if let Some(frame) = frame_for_line(line.trim()) {
                let terminal = frame == StreamFrame::Done;
                frames.push(frame);
                if terminal {
                    break;
                }
            }
        }

        frames
    }
}

fn frame_for_line(line: &str) -> Option<StreamFrame> {
    if line.is_empty() {
        return None;
    }

    if let Some(payload) = line.strip_prefix("data: ") {
        if payload == "[DONE]" {
            return Some(StreamFrame::Done);
        }
        return Some(StreamFrame::Data(payload.to_string()));
    }

    // Anything else is forwarded wrapped rather than dropped, so a byte
    // range the upstream produced is never silently lost.
    Some(StreamFrame::Data(json!({ "raw": line }).to_string()))
}
