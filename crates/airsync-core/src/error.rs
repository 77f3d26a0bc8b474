//! Error types for airsync-core.
//!
//! # Recovery strategies
//!
//! Different errors call for different handling. The background scheduler
//! relies on [`Error::is_retryable`] to decide whether a failed tick is worth
//! waiting out (the next scheduled tick is the only retry mechanism) or is a
//! data problem no amount of retrying will fix.
//!
//! | Error | Retryable | Rationale |
//! |-------|-----------|-----------|
//! | [`Error::Network`] | yes | Connectivity and timeouts are transient |
//! | [`Error::Server`] | yes | The store may recover by the next tick |
//! | [`Error::Truncated`] | yes | A narrower window can succeed |
//! | [`Error::Auth`] | no | Credentials must be fixed first |
//! | [`Error::Parse`] | no | Malformed data will stay malformed |
//! | [`Error::InvalidConfig`] | no | Fix configuration and restart |
//! | [`Error::Cancelled`] | no | Intentional abort |
//!
//! Zero rows is never an error: an empty page terminates pagination and an
//! empty table yields `Ok(None)` from a latest query.

use thiserror::Error;

use airsync_types::ParseError;

/// Errors that can occur when synchronizing with the remote store.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Connectivity failure or request timeout.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The store rejected our credentials (HTTP 401/403).
    #[error("Authentication rejected (status {status})")]
    Auth {
        /// The HTTP status code received.
        status: u16,
    },

    /// Non-success HTTP response or absent body.
    #[error("Server error (status {status}): {message}")]
    Server {
        /// The HTTP status code received.
        status: u16,
        /// Response body text, or the status line when no body was present.
        message: String,
    },

    /// A response body or timestamp did not have the expected shape.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The fetch was cancelled before completion.
    #[error("Operation cancelled")]
    Cancelled,

    /// Pagination hit the page cap before exhausting the window.
    #[error("Fetch truncated after {pages} pages ({readings} readings); narrow the window")]
    Truncated {
        /// Pages fetched before aborting.
        pages: usize,
        /// Readings assembled before aborting.
        readings: usize,
    },
}

impl Error {
    /// Whether waiting for the next scheduled attempt can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Server { .. } | Error::Truncated { .. }
        )
    }

    /// Map a transport error from reqwest into the engine taxonomy.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => Error::Auth {
                status: status.as_u16(),
            },
            Some(status) => Error::Server {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Error::Network(err),
        }
    }
}

/// Result type alias using airsync-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(
            Error::Server {
                status: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
        assert!(
            Error::Truncated {
                pages: 64,
                readings: 64_000
            }
            .is_retryable()
        );
        assert!(!Error::Auth { status: 401 }.is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(
            !Error::Parse(ParseError::InvalidData("bad body".into())).is_retryable()
        );
        assert!(!Error::InvalidConfig("empty url".into()).is_retryable());
    }

    #[test]
    fn test_display_carries_context() {
        let err = Error::Server {
            status: 500,
            message: "boom".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));

        let err = Error::Truncated {
            pages: 64,
            readings: 64_000,
        };
        assert!(err.to_string().contains("64 pages"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::InvalidData("nope".into()).into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
