//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Usernames: letter first, then letters, digits, dot, underscore or hyphen
static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9._-]{2,49}$").unwrap());

/// Document file names: no path separators or control characters, one extension
static DOCUMENT_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^/\\\x00-\x1f]{1,200}\.([A-Za-z0-9]{1,10})$").unwrap());

/// Validate a username
pub fn validate_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

/// Lowercase extension of a document name, if the name is acceptable
pub fn document_extension(file_name: &str) -> Option<String> {
    DOCUMENT_NAME_REGEX
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|ext| ext.as_str().to_ascii_lowercase())
}

/// Validate a document name against a list of allowed extensions
pub fn validate_document_name(file_name: &str, allowed: &[String]) -> bool {
    document_extension(file_name)
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

/// Truncate to at most `max` characters, respecting char boundaries
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
