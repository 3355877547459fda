use log::warn;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// One protocol-relevant frame of a streaming response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of a `data:` line, still undecoded.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Splits an incoming byte stream into complete lines. A trailing partial
/// line is carried over to the next chunk, so a frame split across two
/// network reads is not lost.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Absorbs one chunk and returns every line it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            match String::from_utf8(line) {
                Ok(text) => lines.push(text),
                Err(e) => warn!("Dropping non-UTF-8 stream line: {}", e),
            }
        }
        lines
    }
}

/// Classifies one line of the body. Lines without the `data: ` prefix are
/// keep-alives or comments and yield `None`.
pub fn parse_frame(line: &str) -> Option<SseFrame> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload == DONE_SENTINEL {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(payload.to_string()))
    }
}
