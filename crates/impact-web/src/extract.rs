//! Custom extractors for console requests

use axum::{
    Form, Json, async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{
        HeaderMap, HeaderName, StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, REFERER},
        request::Parts,
    },
    response::{IntoResponse, Response},
};
use impact_core::session::Session;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::ops::Deref;

/// Cookie holding the access token
pub const TOKEN_COOKIE: &str = "impact_token";
/// Cookie holding the refresh token
pub const REFRESH_COOKIE: &str = "impact_refresh";

/// Custom error type for extractors
#[derive(Debug)]
pub struct ExtractorError {
    /// Error message
    pub message: String,
    /// HTTP status code
    pub status: StatusCode,
    /// Error code for API responses
    pub code: String,
}

impl ExtractorError {
    /// Create a new extractor error
    #[must_use]
    pub fn new(message: impl Into<String>, status: StatusCode, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            code: code.into(),
        }
    }

    /// Create a bad request error
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST, "BAD_REQUEST")
    }

    /// Create an unauthorized error
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
    }
}

impl fmt::Display for ExtractorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ExtractorError {}

/// Error response for extractors
#[derive(Debug, Serialize)]
pub struct ExtractorErrorResponse {
    /// Always false
    pub success: bool,
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
}

impl IntoResponse for ExtractorError {
    fn into_response(self) -> Response {
        let response = ExtractorErrorResponse {
            success: false,
            error: self.message,
            code: self.code,
        };

        (self.status, Json(response)).into_response()
    }
}

/// Value of cookie `name` in a `Cookie` header
#[must_use]
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn query_param(parts: &Parts, name: &str) -> Option<String> {
    parts.uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name)
            .then(|| urlencoding::decode(value).ok())
            .flatten()
            .map(|value| value.into_owned())
    })
}

/// Raw access token: `Authorization` header, then cookie, then `?token=`
fn raw_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| cookie(&parts.headers, TOKEN_COOKIE).map(str::to_string))
        .or_else(|| query_param(parts, "token"))
        .filter(|token| !token.trim().is_empty())
}

/// The signed-in user, decoded from the access token
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// Decoded claims
    pub session: Session,
    /// Refresh token from the cookie, if any
    pub refresh_token: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ExtractorError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = raw_token(parts)
            .ok_or_else(|| ExtractorError::unauthorized("Authentication required"))?;
        let session = Session::decode_active(&token, chrono::Utc::now())
            .map_err(|e| ExtractorError::unauthorized(e.to_string()))?;
        let refresh_token = cookie(&parts.headers, REFRESH_COOKIE).map(str::to_string);

        Ok(Self {
            session,
            refresh_token,
        })
    }
}

impl Deref for SessionUser {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

/// How a mutation answers: JSON for scripts, a redirect for plain forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMode {
    /// `{success, message}` body
    Json,
    /// 303 back to the page that submitted the form
    Redirect {
        /// Page to return to
        back: String,
    },
}

impl ReplyMode {
    /// Decide from request headers
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default();
        if header(CONTENT_TYPE).starts_with("application/json") || header(ACCEPT).contains("application/json") {
            return Self::Json;
        }
        Self::Redirect {
            back: same_origin_path(header(REFERER)).unwrap_or_else(|| "/console".to_string()),
        }
    }
}

/// Path and query of a referer, dropping scheme and host
fn same_origin_path(referer: &str) -> Option<String> {
    let rest = referer.split_once("://").map_or(referer, |(_, rest)| rest);
    let path = if referer.contains("://") {
        rest.find('/').and_then(|idx| rest.get(idx..))?
    } else {
        rest
    };
    (path.starts_with('/') && !path.starts_with("//")).then(|| path.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for ReplyMode
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Body accepted as JSON or as an urlencoded form
#[derive(Debug, Clone)]
pub struct Payload<T> {
    /// Decoded body
    pub data: T,
    /// How to answer
    pub mode: ReplyMode,
}

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ExtractorError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mode = ReplyMode::from_headers(req.headers());
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let data = if is_json {
            let Json(data) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ExtractorError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;
            data
        } else {
            let Form(data) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ExtractorError::bad_request(format!("Invalid form: {}", e.body_text())))?;
            data
        };

        Ok(Self { data, mode })
    }
}

impl<T> Deref for Payload<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
