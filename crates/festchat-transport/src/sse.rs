//! Incremental Server-Sent Events parser.
//!
//! Fed raw bytes as they arrive from the HTTP body; yields complete
//! events. Handles `data:` lines (multi-line data joined with `\n`),
//! ignores comments and non-data fields, tolerates CRLF line endings,
//! and buffers partial lines (including UTF-8 sequences split across
//! read boundaries).

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Joined `data:` payload of the event.
    pub data: String,
}

/// Incremental SSE parser. Feed bytes with [`SseParser::push`].
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                // Blank line dispatches the accumulated event.
                if !self.data_lines.is_empty() {
                    events.push(SseEvent {
                        data: self.data_lines.join("\n"),
                    });
                    self.data_lines.clear();
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                self.data_lines.push(rest.to_owned());
            }
            // Comments (`:`) and other fields (event:, id:, retry:) are
            // irrelevant to this transport and skipped.
        }

        events
    }
}
