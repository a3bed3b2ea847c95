// src/io/framer.rs
//
// Newline framing for text arriving over a byte stream.
//
// Bytes are decoded as UTF-8 in streaming mode: a multi-byte sequence split
// across reads is carried over to the next read, invalid bytes become U+FFFD.
// Lines end at LF; a CR before the LF is dropped.

pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Splits a byte stream into text lines, preserving arrival order.
pub struct LineFramer {
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending_utf8: Vec<u8>,
    buffer: String,
    max_length: usize,
    /// Dropping an overlong line until its newline arrives
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Lines longer than `max_length` characters are dropped.
    pub fn with_max_length(max_length: usize) -> Self {
        LineFramer {
            pending_utf8: Vec::new(),
            buffer: String::new(),
            max_length,
            discarding: false,
        }
    }

    /// Feed one chunk, returning every line it completes.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let text = self.decode_utf8(data);
        self.buffer.push_str(&text);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop(); // '\n'
            if line.ends_with('\r') {
                line.pop();
            }
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.chars().count() > self.max_length {
                tlog!(
                    "[framer] Discarding line longer than {} characters",
                    self.max_length
                );
                continue;
            }
            lines.push(line);
        }

        if self.buffer.chars().count() > self.max_length {
            tlog!(
                "[framer] Discarding line longer than {} characters",
                self.max_length
            );
            self.buffer.clear();
            self.discarding = true;
        }

        lines
    }

    /// Text buffered after the last newline.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Take whatever is buffered as a final, unterminated line.
    pub fn flush(&mut self) -> Option<String> {
        if !self.pending_utf8.is_empty() {
            let tail = std::mem::take(&mut self.pending_utf8);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let discarding = std::mem::replace(&mut self.discarding, false);
        let line = std::mem::take(&mut self.buffer);
        if line.is_empty() || discarding {
            None
        } else {
            Some(line)
        }
    }

    fn decode_utf8(&mut self, data: &[u8]) -> String {
        let mut pending = std::mem::take(&mut self.pending_utf8);
        pending.extend_from_slice(data);

        let mut out = String::with_capacity(pending.len());
        let mut input: &[u8] = &pending;

        loop {
            match std::str::from_utf8(input) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    if let Ok(s) = std::str::from_utf8(valid) {
                        out.push_str(s);
                    }
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.pending_utf8 = rest.to_vec();
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                    }
                }
            }
        }

        out
    }
}

// ============================================================================
// Tests
// ============================================================================
