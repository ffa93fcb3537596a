//! Error types for the Impact admin console

use std::{error::Error as StdError, fmt};

/// Main error type for the console core
#[derive(Debug)]
pub enum Error {
    /// Configuration error
    Configuration {
        /// Error message
        message: String,
    },

    /// Validation error
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// Session token could not be decoded or is no longer valid
    Authentication(String),

    /// Role claim that no console shell accepts
    UnauthorizedRole {
        /// The raw role string from the token
        role: String,
    },

    /// Not found error
    NotFound {
        /// Resource that was not found
        resource: String,
    },

    /// Serialization error
    Serialization(serde_json::Error),

    /// Other error
    Other(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a validation error for `field`
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { message } => write!(f, "Configuration error: {message}"),
            Self::Validation { field, message } => {
                write!(f, "Validation error: {field} - {message}")
            }
            Self::Authentication(msg) => write!(f, "Authentication failed: {msg}"),
            Self::UnauthorizedRole { role } => write!(f, "Unauthorized role: {role}"),
            Self::NotFound { resource } => write!(f, "Resource not found: {resource}"),
            Self::Serialization(err) => write!(f, "Serialization error: {err}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::missing_panics_doc,
    clippy::uninlined_format_args,
    clippy::unwrap_used,
    clippy::panic
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_configuration_error() {
        let error = Error::Configuration {
            message: "backend.base_url is empty".to_string(),
        };

        assert_eq!(
            format!("{}", error),
            "Configuration error: backend.base_url is empty"
        );
    }

    #[test]
    fn test_validation_helper() {
        let error = Error::validation("query", "too long");
        assert_eq!(error.to_string(), "Validation error: query - too long");
    }

    #[test]
    fn test_authentication_error() {
        let error = Error::Authentication("token expired".to_string());
        assert_eq!(error.to_string(), "Authentication failed: token expired");
    }

    #[test]
    fn test_unauthorized_role_error() {
        let error = Error::UnauthorizedRole {
            role: "guest".to_string(),
        };
        assert_eq!(error.to_string(), "Unauthorized role: guest");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app_error = Error::from(json_error);

        match app_error {
            Error::Serialization(_) => {}
            _ => panic!("Expected Serialization error variant"),
        }

        assert!(app_error.to_string().contains("Serialization error"));
        assert!(app_error.source().is_some());
    }

    #[test]
    fn test_error_source_for_plain_variants() {
        assert!(Error::Other("x".to_string()).source().is_none());
        assert!(
            Error::NotFound {
                resource: "org 7".to_string()
            }
            .source()
            .is_none()
        );
    }

    #[test]
    fn test_other_error() {
        let error = Error::Other("Unexpected error occurred".to_string());
        assert_eq!(format!("{}", error), "Unexpected error occurred");
    }
}
