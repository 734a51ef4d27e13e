//! FTP reply parsing
//!
//! Assembles one logical reply from the lines of the control connection.
//!
//! Lines that arrive before any `DDD` code are kept as ill-formed
//! informational text and do not end the reply. This tolerance is a
//! deliberately permissive policy for chatty servers, not an RFC 959 rule.

use log::{debug, warn};
use tokio::io::AsyncBufRead;

use crate::error::{FtpError, ProtocolError};
use crate::protocol::reader::{Line, read_line};
use crate::protocol::responses::Reply;

/// Capacity and strictness settings for reply parsing
#[derive(Debug, Clone, Copy)]
pub struct ReplyLimits {
    pub max_line_len: usize,
    pub max_reply_len: usize,
    pub strict: bool,
}

impl Default for ReplyLimits {
    fn default() -> Self {
        Self {
            max_line_len: 512,
            max_reply_len: 64 * 1024,
            strict: false,
        }
    }
}

/// Extracts the reply code of a line starting with three digits in 100..=599.
pub fn reply_code(line: &str) -> Option<u16> {
    let prefix = line.as_bytes().get(..3)?;
    if !prefix.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code = prefix
        .iter()
        .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));
    (100..=599).contains(&code).then_some(code)
}

/// True when the line is `DDD-...`, opening a multiline reply.
fn opens_multiline(line: &Line) -> bool {
    line.as_bytes().get(3) == Some(&b'-')
}

/// True when the line is `DDD ...` with the same digits as the opening line.
fn closes_multiline(line: &Line, code: u16) -> bool {
    reply_code(line.text()) == Some(code) && line.as_bytes().get(3) == Some(&b' ')
}

/// Appends as much of `line` as fits in `max_len`, flagging any loss.
fn append_bounded(text: &mut String, line: &str, max_len: usize, truncated: &mut bool) {
    let room = max_len.saturating_sub(text.len());
    if line.len() <= room {
        text.push_str(line);
        return;
    }

    let mut cut = room;
    while !line.is_char_boundary(cut) {
        cut -= 1;
    }
    text.push_str(&line[..cut]);
    *truncated = true;
}

/// Reads one complete reply.
///
/// Fails with `ProtocolError::UnexpectedClose` when the stream ends before a
/// reply code was seen. A multiline reply cut short by the peer is returned
/// with `is_complete() == false`.
pub async fn read_reply<R>(reader: &mut R, limits: &ReplyLimits) -> Result<Reply, FtpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut text = String::new();
    let mut truncated = false;
    let mut code: Option<u16> = None;

    let complete = loop {
        let line = match read_line(reader, limits.max_line_len).await? {
            Some(line) => line,
            None if code.is_none() => return Err(ProtocolError::UnexpectedClose.into()),
            None => {
                warn!("Connection closed inside multiline reply {:?}", code);
                break false;
            }
        };

        if line.is_truncated() {
            warn!("Reply line exceeded {} bytes and was truncated", limits.max_line_len);
            truncated = true;
        }
        append_bounded(&mut text, line.text(), limits.max_reply_len, &mut truncated);

        match code {
            None => match reply_code(line.text()) {
                Some(found) => {
                    code = Some(found);
                    if !opens_multiline(&line) {
                        break true;
                    }
                }
                None => debug!("Ill-formed reply line: {:?}", line.text()),
            },
            Some(anchor) => {
                if closes_multiline(&line, anchor) {
                    break true;
                }
            }
        }
    };

    if truncated {
        if limits.strict {
            return Err(ProtocolError::Truncated { code, text }.into());
        }
        warn!("Reply {:?} truncated to {} bytes", code, text.len());
    }

    debug!("<-- {}", text.trim_end());
    Ok(Reply::parsed(code, text, complete, truncated))
}
