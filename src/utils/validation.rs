//! Input validation utilities
//!
//! Guards command arguments before they are written to the control line.

/// Validate that an argument is non-empty and cannot break command framing
pub fn is_valid_argument(input: &str) -> bool {
    !input.trim().is_empty() && !input.contains(['\r', '\n', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_framing_characters() {
        assert!(is_valid_argument("report.pdf"));
        assert!(is_valid_argument("my file.txt"));
        assert!(!is_valid_argument("   "));
        assert!(!is_valid_argument("a\r\nDELE b"));
        assert!(!is_valid_argument("nul\0byte"));
    }
}
