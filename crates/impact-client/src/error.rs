//! Error types for backend calls

use thiserror::Error;

/// Result type alias for backend calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the LMS backend
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced an HTTP response
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Text taken from `error`, `message`, or the status line
        message: String,
    },

    /// The backend answered 2xx but flagged the call as failed
    #[error("{message}")]
    Application {
        /// Text taken from `error` or `message`
        message: String,
    },

    /// The payload did not have the expected shape
    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was rejected before it was sent
    #[error("Invalid request: {0}")]
    Invalid(#[from] impact_core::Error),
}

impl ClientError {
    /// HTTP status, when the failure carried one
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a fresh token might fix the call
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }

    /// The single line shown inline on a failed panel
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Status { status: 401, .. } => {
                "Authentication required. Please log in again.".to_string()
            }
            Self::Status { status: 403, .. } => "Access denied. Admin privileges required.".to_string(),
            Self::Status { message, .. } | Self::Application { message } => message.clone(),
            Self::Network(err) if err.is_timeout() => "Request timed out".to_string(),
            Self::Network(_) => "Network error while contacting the server".to_string(),
            Self::Decode(_) => "Unexpected response from server".to_string(),
            Self::Invalid(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(401, "token expired", "Authentication required. Please log in again.")]
    #[case(403, "nope", "Access denied. Admin privileges required.")]
    #[case(404, "Portal admin not found", "Portal admin not found")]
    #[case(500, "HTTP 500", "HTTP 500")]
    fn test_status_display_message(#[case] status: u16, #[case] message: &str, #[case] shown: &str) {
        let err = ClientError::Status {
            status,
            message: message.to_string(),
        };
        assert_eq!(err.display_message(), shown);
        assert_eq!(err.status(), Some(status));
    }

    #[test]
    fn test_application_error_shows_backend_text() {
        let err = ClientError::Application {
            message: "Username is required".to_string(),
        };
        assert_eq!(err.display_message(), "Username is required");
        assert_eq!(err.to_string(), "Username is required");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_decode_error_message() {
        let json_err = serde_json::from_str::<u64>("\"x\"").unwrap_err();
        let err = ClientError::from(json_err);
        assert_eq!(err.display_message(), "Unexpected response from server");
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = ClientError::Status {
            status: 401,
            message: "Authentication required".to_string(),
        };
        assert!(err.is_unauthorized());
        assert!(!ClientError::Application { message: String::new() }.is_unauthorized());
    }
}
