//! Error types for data parsing in airsync-types.

use thiserror::Error;

/// Errors that can occur when parsing sensor data from the wire.
///
/// This error type is platform-agnostic and does not include transport
/// errors (those belong in airsync-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A wire timestamp could not be parsed.
    #[error("Invalid timestamp: {raw:?}: {message}")]
    InvalidTimestamp {
        /// The raw string as received from the store.
        raw: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A record or response body did not have the expected shape.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ParseError {
    /// Create an invalid timestamp error.
    pub fn invalid_timestamp(raw: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            raw: raw.into(),
            message: message.into(),
        }
    }
}

/// Result type alias using airsync-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
