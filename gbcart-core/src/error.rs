use thiserror::Error;

/// Errors that can occur while parsing a cartridge header.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// The buffer is too small to contain a header
    #[error("Header too small: expected at least {expected} bytes, got {actual}")]
    TooSmall { expected: usize, actual: usize },

    /// A header field holds a value the parser cannot interpret
    #[error("Malformed header: {0}")]
    Malformed(String),
}

impl HeaderError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
