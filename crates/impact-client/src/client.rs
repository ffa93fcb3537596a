//! HTTP client for communicating with the LMS backend

use std::sync::Arc;

use impact_core::config::BackendConfig;
use impact_core::session::Session;
use impact_core::types::TokenPair;
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{self, Body};
use crate::error::{ClientError, ClientResult};

/// Token pair held by a client
#[derive(Debug, Default)]
struct Credentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// API client for the LMS REST backend
///
/// Cloning is cheap and clones share credentials, so a token refreshed by one
/// clone is used by all of them. Use [`ApiClient::for_session`] to get a
/// client with credentials of its own.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<RwLock<Credentials>>,
}

impl ApiClient {
    /// Create a new API client with default HTTP settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), base_url)
    }

    /// Create a client using the configured timeout
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &BackendConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_http_client(client, config.base_url.clone()))
    }

    fn with_http_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Arc::new(RwLock::new(Credentials::default())),
        }
    }

    /// Set the bearer token sent with every request
    #[must_use]
    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        let refresh_token = self.credentials.read().refresh_token.clone();
        self.with_credentials(Some(token.into()), refresh_token)
    }

    /// Set the refresh token used after a 401
    #[must_use]
    pub fn with_refresh_token(self, token: impl Into<String>) -> Self {
        let access_token = self.credentials.read().access_token.clone();
        self.with_credentials(access_token, Some(token.into()))
    }

    fn with_credentials(mut self, access_token: Option<String>, refresh_token: Option<String>) -> Self {
        self.credentials = Arc::new(RwLock::new(Credentials {
            access_token,
            refresh_token,
        }));
        self
    }

    /// A client sharing this one's connection pool but acting as `session`
    #[must_use]
    pub fn for_session(&self, session: &Session) -> Self {
        self.clone()
            .with_credentials(Some(session.token().to_string()), None)
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, if any
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.credentials.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.credentials.read().refresh_token.clone()
    }

    pub(crate) async fn get(&self, path: &str) -> ClientResult<Body> {
        self.request(Method::GET, path, None).await
    }

    pub(crate) async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> ClientResult<Body> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(body)).await
    }

    pub(crate) async fn patch<T: Serialize + Sync>(&self, path: &str, body: &T) -> ClientResult<Body> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> ClientResult<Body> {
        self.request(Method::DELETE, path, None).await
    }

    /// Send a request, refreshing the access token once on a 401
    ///
    /// Notification polling is exempt from the refresh so that a background
    /// badge cannot rotate tokens behind the user's back.
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<Body> {
        let result = self.send_once(&method, path, body.as_ref(), true).await;

        match result {
            Err(err) if err.is_unauthorized() && !path.starts_with("/api/notifications") => {
                let Some(refresh_token) = self.refresh_token() else {
                    return Err(err);
                };

                if let Err(refresh_err) = self.refresh_access_token(&refresh_token).await {
                    warn!(path, error = %refresh_err, "Token refresh failed");
                    let mut credentials = self.credentials.write();
                    credentials.access_token = None;
                    credentials.refresh_token = None;
                    return Err(ClientError::Status {
                        status: 401,
                        message: "Authentication required".to_string(),
                    });
                }

                debug!(path, "Retrying request with refreshed token");
                self.send_once(&method, path, body.as_ref(), true).await
            }
            other => other,
        }
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> ClientResult<()> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .send_once(&Method::POST, "/api/refresh", Some(&body), false)
            .await?;
        let tokens: TokenPair = envelope::into_payload(response)?;

        let mut credentials = self.credentials.write();
        credentials.access_token = Some(tokens.access_token);
        credentials.refresh_token = Some(tokens.refresh_token);
        Ok(())
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        authorize: bool,
    ) -> ClientResult<Body> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let token = if authorize { self.bearer_token() } else { None };
        if let Some(ref token) = token {
            request = request.bearer_auth(token);
        }

        debug!(%method, path, authorized = token.is_some(), "Sending backend request");

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let text = response.text().await?;

        let body = envelope::normalize(status, content_type.as_deref(), &text);
        let result = envelope::interpret(status, body);
        if let Err(ref e) = result {
            debug!(%method, path, status = status.as_u16(), error = %e, "Backend request failed");
        }
        result
    }
}

/// Percent-encode a value placed in a path segment or query string
pub(crate) fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
