//! Loose email-shape checking.
//!
//! This is not an RFC 5321 parser. An address has the right shape when it has
//! a local part without `@`, then `@`, then a domain with at least one dotted
//! label followed by a tail that itself contains no `@`. Whitespace and control
//! characters are never part of the shape.

use std::sync::LazyLock;

use regex::Regex;

use crate::text::is_blank;

#[allow(clippy::expect_used)]
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s\p{Cc}]+@([^@.\s\p{Cc}]+\.)[^@\s\p{Cc}]+$")
        .expect("email shape regex is valid")
});

/// Returns `true` if `address` has the email shape.
///
/// Blank input is vacuously accepted; callers that need presence check it
/// separately.
pub fn has_email_shape(address: &str) -> bool {
    is_blank(address) || EMAIL_SHAPE.is_match(address)
}

/// Like [`has_email_shape`] but blank input fails.
pub fn is_email(address: &str) -> bool {
    !is_blank(address) && EMAIL_SHAPE.is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_addresses() {
        assert!(has_email_shape("a@b.com"));
        assert!(has_email_shape("first.last+tag@mail.example.org"));
        assert!(is_email("x@y.co"));
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for address in ["bad", "@b.com", "a@b", "a@.com", "a@b.", "a@@b.com", "a@b.c@d"] {
            assert!(!has_email_shape(address), "{address} should be rejected");
        }
    }

    #[test]
    fn test_rejects_line_breaks_and_controls() {
        for address in [
            "desk\r\nBcc: victim@evil.com",
            "a@b.com\nBcc: c@d.com",
            "a b@c.com",
            "a@b.com\0",
        ] {
            assert!(!has_email_shape(address), "{address:?} should be rejected");
            assert!(!is_email(address), "{address:?} should be rejected");
        }
    }

    #[test]
    fn test_blank_handling() {
        assert!(has_email_shape(""));
        assert!(has_email_shape("   "));
        assert!(!is_email(""));
        assert!(!is_email("  "));
    }
}
