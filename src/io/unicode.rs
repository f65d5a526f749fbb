//! Small UTF-8 boundary helpers used at the document-input edge.
//!
//! Ported from the teacher's `io/unicode.rs`, trimmed to the two helpers
//! this crate actually needs: validating a raw byte buffer is UTF-8 before
//! it becomes a `ParsedDocument`, and finding a safe truncation point for
//! error messages and previews that must not land mid-codepoint.

/// Finds a valid UTF-8 character boundary at or before `pos`.
#[must_use]
pub const fn find_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let bytes = s.as_bytes();
    let mut boundary = pos;
    while boundary > 0 && (bytes[boundary] & 0xC0) == 0x80 {
        boundary -= 1;
    }
    boundary
}

/// Validates that `bytes` is well-formed UTF-8.
///
/// Returns the decoded `&str` on success, or the byte offset of the first
/// invalid sequence on failure — this offset becomes
/// [`crate::error::InputError::InvalidUtf8`]'s `offset` field.
///
/// # Errors
///
/// Returns the byte offset of the first invalid UTF-8 sequence.
pub fn validate_utf8(bytes: &[u8]) -> std::result::Result<&str, usize> {
    std::str::from_utf8(bytes).map_err(|e| e.valid_up_to())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_char_boundary_backs_up_out_of_a_multibyte_char() {
        let s = "Hello 世界!";
        assert_eq!(find_char_boundary(s, 6), 6);
        assert_eq!(find_char_boundary(s, 7), 6);
        assert_eq!(find_char_boundary(s, 8), 6);
        assert_eq!(find_char_boundary(s, 9), 9);
        assert_eq!(find_char_boundary(s, 100), s.len());
    }

    #[test]
    fn validate_utf8_reports_offset_of_first_bad_byte() {
        assert!(validate_utf8("世界".as_bytes()).is_ok());
        let invalid = [b'o', b'k', 0xFF, 0xFE];
        assert_eq!(validate_utf8(&invalid), Err(2));
    }
}
