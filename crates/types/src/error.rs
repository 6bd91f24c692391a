//! Unified error type for the huddle workspace.

use thiserror::Error;

/// Enumerates all error kinds that can occur across huddle crates.
#[derive(Debug, Error)]
pub enum HuddleError {
    /// Transport or connectivity failure; no HTTP response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success HTTP status.
    #[error("api error: status={status}, message={message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the error body, or a generic fallback.
        message: String,
    },

    /// A 401 whose token refresh also failed; the session cannot be recovered.
    #[error("session expired")]
    SessionExpired,

    /// The request could not be constructed (bad header value, MIME type, …).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persistent key/value storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for HuddleError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for HuddleError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl HuddleError {
    /// Returns the HTTP status code, if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the error means the session is gone and the user
    /// must sign in again.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_network() {
        let err = HuddleError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "network error: connection refused");
    }

    #[test]
    fn test_error_display_api() {
        let err = HuddleError::Api {
            status: 422,
            message: "title is required".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("422"));
        assert!(s.contains("title is required"));
    }

    #[test]
    fn test_status_only_on_api() {
        let api = HuddleError::Api {
            status: 404,
            message: String::new(),
        };
        assert_eq!(api.status(), Some(404));
        assert_eq!(HuddleError::Network("x".into()).status(), None);
        assert_eq!(HuddleError::SessionExpired.status(), None);
    }

    #[test]
    fn test_is_session_expired() {
        assert!(HuddleError::SessionExpired.is_session_expired());
        assert!(
            !HuddleError::Api {
                status: 401,
                message: String::new()
            }
            .is_session_expired()
        );
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid {{{").unwrap_err();
        let err: HuddleError = json_err.into();
        assert!(matches!(err, HuddleError::Serialization(_)));
    }
}
