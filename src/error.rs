//! Error types
//!
//! Three independent failure kinds, unified by [`Error`]:
//! - [`ParseError`]: the input is not well-formed XML (construction only)
//! - [`XPathError`]: an XPath string is outside the supported grammar
//! - [`TimestampError`]: a value is not an ISO-8601 instant
//!
//! A path that matches nothing is never an error.

use thiserror::Error;

/// Malformed XML. Carries the byte offset where scanning stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

/// Malformed or unsupported XPath expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid XPath {xpath:?}: {message} (at position {position})")]
pub struct XPathError {
    pub xpath: String,
    pub message: String,
    /// Byte position in the XPath string
    pub position: usize,
}

impl XPathError {
    pub fn new(xpath: &str, message: impl Into<String>, position: usize) -> Self {
        XPathError {
            xpath: xpath.to_string(),
            message: message.into(),
            position,
        }
    }
}

/// A value that does not parse as an ISO-8601 instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp {value:?}")]
pub struct TimestampError {
    pub value: String,
    /// None when the value was rejected before reaching chrono
    #[source]
    pub source: Option<chrono::ParseError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    XPath(#[from] XPathError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("Tag mismatch: <a> closed with </b>", 12);
        assert_eq!(err.to_string(), "Tag mismatch: <a> closed with </b> at byte 12");
    }

    #[test]
    fn test_xpath_error_converts() {
        let err: Error = XPathError::new("/a[", "Expected ]", 3).into();
        assert!(matches!(err, Error::XPath(ref e) if e.position == 3));
        assert!(err.to_string().contains("Expected ]"));
    }
}
