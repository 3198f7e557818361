//! Error types for the binary codec.

use thiserror::Error;

/// Result alias used throughout the codec.
pub type IoResult<T> = Result<T, IoError>;

/// Errors raised while encoding or decoding binary data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// Fewer bytes remain than the read requires.
    #[error("unexpected end of data: needed {needed} bytes at offset {offset}, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A length or count prefix exceeded the caller's bound.
    #[error("value {value} exceeds maximum {max}")]
    ExceedsMaximum { value: u64, max: u64 },

    /// The encoded bytes do not form a valid value.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl IoError {
    /// Creates an [`IoError::InvalidData`] with the given message.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}
