//! Error types for cursor operations.

use std::fmt;

/// Result type for cursor operations.
pub type ByteResult<T> = Result<T, ByteError>;

/// Errors that can occur while reading or writing the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteError {
    /// Attempted to read past the end of the buffer.
    Truncated {
        /// Number of bytes requested.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// A length-prefixed string was not well-formed UTF-8.
    InvalidUtf8 {
        /// Byte offset of the string payload within the buffer.
        position: usize,
    },

    /// A string exceeds the 16-bit length prefix.
    StringTooLong {
        /// Byte length of the offending string.
        length: usize,
    },
}

impl fmt::Display for ByteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated input: need {needed} bytes, {available} available")
            }
            Self::InvalidUtf8 { position } => {
                write!(f, "invalid UTF-8 in string at byte offset {position}")
            }
            Self::StringTooLong { length } => {
                write!(f, "string of {length} bytes exceeds the u16 length prefix")
            }
        }
    }
}

impl std::error::Error for ByteError {}
