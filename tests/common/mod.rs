//! Common test utilities for integration tests
#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use impact_client::ApiClient;
use impact_core::{Claims, Config};
use impact_web::{AppState, SharedState, build_app_with_state};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::{Arc, Once};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT_LOGGER: Once = Once::new();

/// Initialize test logging (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Signed token for `username` with `role`, valid for an hour
pub fn mint_token(username: &str, role: &str) -> String {
    mint_token_expiring(username, role, chrono::Utc::now().timestamp() + 3600)
}

/// Signed token with an explicit expiry
pub fn mint_token_expiring(username: &str, role: &str, exp: i64) -> String {
    let claims = Claims {
        user_id: 1,
        username: username.to_string(),
        role: role.to_string(),
        email: Some(format!("{username}@lms.test")),
        org_id: Some(2),
        org_name: Some("Acme".to_string()),
        token_type: Some("access".to_string()),
        exp: Some(exp),
        iat: Some(chrono::Utc::now().timestamp()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret"))
        .expect("Failed to encode test token")
}

/// Configuration pointed at `backend` with short intervals
pub fn test_config(backend: &str) -> Config {
    let mut config = Config::default();
    config.backend.base_url = backend.to_string();
    config.refresh.first_load_timeout_ms = 2_000;
    config
}

/// Console wired to a mock backend
pub struct TestConsole {
    pub backend: MockServer,
    pub state: SharedState,
    pub app: Router,
}

impl TestConsole {
    pub async fn start() -> Self {
        init_test_logging();
        let backend = MockServer::start().await;
        let config = test_config(&backend.uri());
        let state = Arc::new(AppState::with_client(config, ApiClient::new(backend.uri())));
        let app = build_app_with_state(Arc::clone(&state));
        Self { backend, state, app }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).expect("Valid request")).await
    }

    pub async fn post_form(&self, uri: &str, token: &str, form: &str, referer: &str) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Referer", referer)
            .body(Body::from(form.to_string()))
            .expect("Valid request");
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: &Value) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(Body::from(body.to_string()))
            .expect("Valid request");
        self.send(request).await
    }
}

impl Drop for TestConsole {
    fn drop(&mut self) {
        self.state.shutdown();
    }
}

/// Response body as text
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("Body is not JSON")
}

/// Mount the unread badge endpoint every console view polls
pub async fn mount_unread(backend: &MockServer, count: u64) {
    Mock::given(method("GET"))
        .and(path("/api/notifications/unread_count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "unread_count": count})))
        .mount(backend)
        .await;
}

/// Mount a system stats payload
pub async fn mount_system_stats(backend: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/admin/system_stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "total_users": 120,
                "active_users": 80,
                "total_courses": 9,
                "total_organizations": 3,
                "total_portal_admins": 3,
                "completion_rate": 64.5,
                "avg_quiz_score": 71.25,
                "recent_organizations": [
                    {"id": 3, "name": "Acme", "domain": "acme.com", "status": "active", "created": "2024-05-01"}
                ]
            }
        })))
        .mount(backend)
        .await;
}
