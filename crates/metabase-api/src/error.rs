//! Error types for Metabase API operations.
//!
//! Every backend reports failures through [`Error`]. The one distinction the
//! reconciliation layer depends on is [`Error::NotFound`] versus everything
//! else, so it is kept as its own variant and exposed via [`Error::is_not_found`].

use std::fmt;

/// Result type alias for Metabase API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The requested object does not exist (or is deactivated).
    NotFound,
    /// Credentials were rejected.
    Auth,
    /// Connection, DNS or timeout failure.
    Network,
    /// The server answered with an unexpected status.
    Server,
    /// The response body could not be decoded.
    Format,
    /// The client was configured incorrectly.
    Config,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    ///
    /// Nothing in this crate retries automatically; callers may use this to
    /// phrase their advice.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Object not found",
            Self::Auth => "Authentication failed",
            Self::Network => "Network connectivity issue",
            Self::Server => "Unexpected server response",
            Self::Format => "Invalid response format",
            Self::Config => "Invalid client configuration",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the ID exists on the Metabase instance",
            Self::Auth => "Check the API key or the username and password",
            Self::Network => "Check that the Metabase host is reachable and try again",
            Self::Server => "Check the Metabase server logs for details",
            Self::Format => "The Metabase version may not be supported",
            Self::Config => "Check the provider configuration and environment variables",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur when talking to Metabase.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of object ("database", "user", ...).
        kind: String,
        /// Identifier that was requested.
        id: String,
    },

    /// The server rejected our credentials (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Non-success status that is not otherwise classified.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a not-found error for an object kind and id.
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Create a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Unauthorized(_) => ErrorCategory::Auth,
            Error::Status { .. } => ErrorCategory::Server,
            Error::Transport(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether this is a [`Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::status(code, format!("HTTP {code}")),
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_transient() {
        assert!(ErrorCategory::Network.is_transient());
        assert!(!ErrorCategory::NotFound.is_transient());
        assert!(!ErrorCategory::Auth.is_transient());
        assert!(!ErrorCategory::Server.is_transient());
        assert!(!ErrorCategory::Format.is_transient());
        assert!(!ErrorCategory::Config.is_transient());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::Network.advice().is_empty());
        assert!(!ErrorCategory::Auth.advice().is_empty());
        assert!(!ErrorCategory::NotFound.advice().is_empty());
    }

    #[test]
    fn test_error_category_display() {
        let display = format!("{}", ErrorCategory::Auth);
        assert!(display.contains("Authentication"));
    }

    #[test]
    fn test_not_found_constructor() {
        let err = Error::not_found("user", 42);
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "user 42 not found");
    }

    #[test]
    fn test_status_is_not_not_found() {
        let err = Error::status(500, "boom");
        assert!(!err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_from_ureq_status_code() {
        let err: Error = ureq::Error::StatusCode(502).into();
        match err {
            Error::Status { status, .. } => assert_eq!(status, 502),
            _ => panic!("Expected Error::Status"),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
