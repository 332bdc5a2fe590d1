//! Server-Sent Events framing.

use bytes::{BufMut, Bytes, BytesMut};

/// One SSE block: an event kind and any number of data lines, terminated by
/// a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    event: String,
    data: Vec<String>,
}

impl SseFrame {
    /// Starts a frame for the given event kind.
    pub fn event(kind: impl Into<String>) -> Self {
        Self {
            event: kind.into(),
            data: Vec::new(),
        }
    }

    /// Appends `text` as data lines, one per input line, each starting with
    /// `prefix`.
    ///
    /// An empty `text` still produces one line so the prefix is never lost.
    pub fn prefixed_data(mut self, prefix: &str, text: &str) -> Self {
        let mut any = false;
        for line in text.lines() {
            self.data.push(format!("{prefix} {line}"));
            any = true;
        }
        if !any {
            self.data.push(prefix.to_owned());
        }
        self
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(b"event: ");
        buf.put_slice(self.event.as_bytes());
        buf.put_u8(b'\n');
        for line in &self.data {
            buf.put_slice(b"data: ");
            buf.put_slice(line.as_bytes());
            buf.put_u8(b'\n');
        }
        buf.put_u8(b'\n');
        buf.freeze()
    }
}

/// Comment block sent while idle so proxies keep the connection open.
pub fn keep_alive() -> Bytes {
    Bytes::from_static(b": keepalive\n\n")
}
