//! Errors returned by console handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use impact_client::ClientError;
use impact_refresh::RefreshError;
use serde::Serialize;
use thiserror::Error;

/// Result alias for handlers
pub type WebResult<T> = std::result::Result<T, WebError>;

/// Failure of a console request
#[derive(Error, Debug)]
pub enum WebError {
    /// The backend call failed
    #[error("{}", .0.display_message())]
    Backend(#[from] ClientError),

    /// The panel scheduler refused or timed out
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Input rejected before reaching the backend
    #[error("{0}")]
    Invalid(#[from] impact_core::Error),

    /// The signed-in role may not use this endpoint
    #[error("Access denied for role '{role}'")]
    Forbidden {
        /// Raw role claim
        role: String,
    },
}

impl WebError {
    /// HTTP status sent to the browser
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => err
                .status()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Refresh(RefreshError::ShutDown) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Refresh(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Invalid(impact_core::Error::Authentication(_)) => StatusCode::UNAUTHORIZED,
            Self::Invalid(impact_core::Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Refresh(_) => "REFRESH_ERROR",
            Self::Invalid(_) => "INVALID_REQUEST",
            Self::Forbidden { .. } => "FORBIDDEN",
        }
    }
}

/// JSON body of a failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always false
    pub success: bool,
    /// Message shown to the user
    pub error: String,
    /// Error code
    pub code: &'static str,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::warn!(error = %self, code = self.code(), "Request rejected");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
