//! Line reader
//!
//! Splits a buffered byte stream into newline-terminated lines with a hard
//! per-line capacity.

use std::io::ErrorKind;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::StreamError;

/// One line read from the stream, terminator included when it fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    truncated: bool,
}

impl Line {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// True when bytes beyond the capacity were discarded.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Reads the next line, keeping at most `max_len` bytes of it.
///
/// Returns `Ok(None)` on a clean end-of-stream. A stream that ends mid-line
/// yields the partial line. Bytes past `max_len` are consumed up to the
/// newline but dropped, and the line is marked truncated.
pub async fn read_line<R>(reader: &mut R, max_len: usize) -> Result<Option<Line>, StreamError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(max_len.min(256));
    let mut truncated = false;
    let mut seen_bytes = false;

    loop {
        let available = match reader.fill_buf().await {
            Ok(chunk) => chunk,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Io(e)),
        };

        if available.is_empty() {
            if !seen_bytes {
                return Ok(None);
            }
            break;
        }

        let (chunk, found_newline) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (&available[..=pos], true),
            None => (available, false),
        };

        let room = max_len.saturating_sub(buf.len());
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            truncated = true;
        } else {
            buf.extend_from_slice(chunk);
        }

        let used = chunk.len();
        reader.consume(used);
        seen_bytes = true;

        if found_newline {
            break;
        }
    }

    Ok(Some(Line {
        text: String::from_utf8_lossy(&buf).into_owned(),
        truncated,
    }))
}
