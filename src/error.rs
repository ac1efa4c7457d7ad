//! Error types for Confab
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! The storage layer and the assistant gateway return their own typed
//! errors ([`StoreError`], [`GatewayError`]) so callers can react to
//! individual failure modes (for example retrying a rename on `Conflict`).
//! Everything is folded into [`ConfabError`] at the application layer.

use thiserror::Error;

/// Main error type for Confab operations
#[derive(Error, Debug)]
pub enum ConfabError {
    /// Configuration-related errors (missing credentials are fatal)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Assistant gateway failures (recoverable)
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// One uploaded file could not be turned into text
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Session storage failures
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// An operation needs a current session but none is loaded
    #[error("No active conversation")]
    NoActiveSession,

    /// Admin password check failed
    #[error("Incorrect admin password")]
    AdminDenied,
}

/// Failures of the session store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No session is stored under the identifier
    #[error("session not found: {0}")]
    NotFound(String),

    /// The target identifier already names a stored session
    #[error("session already exists: {0}")]
    Conflict(String),

    /// The stored form could not be parsed as a transcript
    #[error("session {id} is corrupt: {reason}")]
    CorruptData {
        /// Identifier of the unreadable session
        id: String,
        /// Parser message
        reason: String,
    },

    /// The identifier cannot be used as a storage key
    #[error("invalid session identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Underlying filesystem failure
    #[error("storage I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

/// Failures of a call to the hosted model
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// Credentials were rejected (401/403)
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The service asked us to slow down (429)
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The response could not be decoded or carried no reply
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other non-success HTTP status
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Transport-level failure (DNS, connection reset, ...)
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::MalformedResponse(err.to_string())
        } else {
            GatewayError::Request(err.to_string())
        }
    }
}

/// An uploaded file could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}: {message}")]
pub struct ExtractionError {
    /// Name of the file that failed
    pub file: String,
    /// What went wrong
    pub message: String,
}

impl ExtractionError {
    /// Create a new extraction error for `file`
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for Confab operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Result of a session store operation
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of an assistant gateway call
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ConfabError::Config("OPENAI_API_KEY not set".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: OPENAI_API_KEY not set"
        );
    }

    #[test]
    fn test_store_not_found_display() {
        let error = StoreError::NotFound("Basic Arithmetic".to_string());
        assert_eq!(error.to_string(), "session not found: Basic Arithmetic");
    }

    #[test]
    fn test_store_corrupt_display() {
        let error = StoreError::CorruptData {
            id: "x".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(error.to_string().contains("x is corrupt"));
        assert!(error.to_string().contains("expected value"));
    }

    #[test]
    fn test_gateway_status_display() {
        let error = GatewayError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "service returned 500: boom");
    }

    #[test]
    fn test_extraction_error_display() {
        let error = ExtractionError::new("report.pdf", "not a PDF");
        assert_eq!(error.to_string(), "report.pdf: not a PDF");
    }

    #[test]
    fn test_store_error_converts_into_confab_error() {
        let error: ConfabError = StoreError::Conflict("a".to_string()).into();
        assert!(matches!(error, ConfabError::Store(StoreError::Conflict(_))));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: StoreError = io_error.into();
        assert!(matches!(error, StoreError::IoFailure(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfabError>();
        assert_send_sync::<StoreError>();
        assert_send_sync::<GatewayError>();
    }
}
