//! FTP Response handling
//!
//! Defines the parsed server reply and its code classes.

/// One logical server reply, possibly spanning several lines.
///
/// `text` holds every received line in order, terminators included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: Option<u16>,
    text: String,
    complete: bool,
    truncated: bool,
}

impl Reply {
    /// Builds a complete, untruncated reply.
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            text: text.into(),
            complete: true,
            truncated: false,
        }
    }

    pub(crate) fn parsed(code: Option<u16>, text: String, complete: bool, truncated: bool) -> Self {
        Self {
            code,
            text,
            complete,
            truncated,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    /// Returns the reply code, if one was found.
    pub fn code(&self) -> Option<u16> {
        self.code
    }

    /// Returns the full accumulated reply text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns whether the reply was properly terminated.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns whether part of the reply text was dropped.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the human-readable part of the final line, without the code.
    pub fn message(&self) -> &str {
        let last = self
            .text
            .trim_end_matches(['\r', '\n'])
            .rsplit('\n')
            .next()
            .unwrap_or("");
        let last = last.trim_end_matches('\r');
        match self.code {
            Some(_) if last.len() >= 4 && last.as_bytes()[..3].iter().all(u8::is_ascii_digit) => {
                last.get(4..).unwrap_or("")
            }
            _ => last,
        }
    }

    // --------------------
    // Reply classes
    // --------------------

    fn class(&self) -> Option<u16> {
        self.code.map(|code| code / 100)
    }

    /// 1xx: positive preliminary
    pub fn is_preliminary(&self) -> bool {
        self.class() == Some(1)
    }

    /// 2xx: positive completion
    pub fn is_success(&self) -> bool {
        self.class() == Some(2)
    }

    /// 3xx: positive intermediate
    pub fn is_intermediate(&self) -> bool {
        self.class() == Some(3)
    }

    /// 4xx: transient negative completion
    pub fn is_transient_failure(&self) -> bool {
        self.class() == Some(4)
    }

    /// 5xx: permanent negative completion
    pub fn is_permanent_failure(&self) -> bool {
        self.class() == Some(5)
    }
}
