//! Input URL cleaning and validation.
//!
//! Submitted URLs are trimmed and stripped of surrounding quotes, then checked
//! for a scheme and a host. The cleaned string is stored as submitted: no
//! re-serialization, so `https://example.com` and `https://example.com/` stay
//! distinct for deduplication.

use url::Url;

/// Errors that can occur while cleaning a URL.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UrlValidationError {
    #[error("URL is empty")]
    Empty,

    #[error("invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("scheme is missing")]
    MissingScheme,

    #[error("host is missing")]
    MissingHost,
}

/// Cleans and validates a submitted URL.
///
/// # Rules
///
/// 1. Leading/trailing whitespace is removed
/// 2. Surrounding `"` and `'` characters are removed
/// 3. The result must parse as an absolute URL with a non-empty host
///
/// # Errors
///
/// Returns [`UrlValidationError::Empty`] if nothing is left after cleaning,
/// otherwise the first failed rule.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_url("  \"https://example.com\"  ").unwrap(), "https://example.com");
/// assert!(clean_url("example.com").is_err());
/// ```
pub fn clean_url(input: &str) -> Result<String, UrlValidationError> {
    let cleaned = input.trim().trim_matches(|c| c == '"' || c == '\'');

    if cleaned.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let parsed = Url::parse(cleaned).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => UrlValidationError::MissingScheme,
        url::ParseError::EmptyHost => UrlValidationError::MissingHost,
        other => UrlValidationError::InvalidFormat(other.to_string()),
    })?;

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(cleaned.to_string())
}
