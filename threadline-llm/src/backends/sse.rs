// ABOUTME: Incremental decoder for server-sent event bodies.
// ABOUTME: Accepts arbitrary byte chunks and yields complete frames as blank lines arrive.

/// One dispatched server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined with '\n'
    pub data: String,
}

/// Line-buffering SSE decoder. Bytes are held until a full line is available,
/// so multi-byte characters split across chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flush whatever is left once the body ends without a trailing blank line
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
            if let Some(frame) = self.process_line(&line) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id and retry carry nothing we act on
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}
