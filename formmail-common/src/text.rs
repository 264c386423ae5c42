//! Blankness helpers.
//!
//! A value is blank when it is absent, empty, or only whitespace. Form data
//! and configuration both treat blank values as missing.

/// Returns `true` if `value` is empty or made up only of whitespace.
#[inline]
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Returns `true` if `value` is `None` or blank.
#[inline]
pub fn is_blank_opt(value: Option<&str>) -> bool {
    value.is_none_or(is_blank)
}

/// Returns the value only if it is present and non-blank.
#[inline]
pub fn presence(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_blank(v))
}
