//! Decoding of the backend's `{success, ...}` response envelope
//!
//! The backend is not consistent: most endpoints answer
//! `{"success": true, ...payload}`, some omit `success` entirely, and
//! failures use either `error` or `message` for the text. Everything funnels
//! through [`normalize`] then [`interpret`] so callers only see a payload map
//! or a [`ClientError`].

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

/// A decoded response body
pub type Body = Map<String, Value>;

/// Turn raw response text into a body map
///
/// Empty bodies and non-JSON bodies are wrapped so that every response has
/// a `success` flag derived from the HTTP status.
#[must_use]
pub fn normalize(status: StatusCode, content_type: Option<&str>, text: &str) -> Body {
    let ok = status.is_success();

    if text.is_empty() {
        let mut body = Body::new();
        body.insert("success".into(), Value::Bool(ok));
        let message = if ok {
            "Success".to_string()
        } else {
            format!("HTTP {}", status.as_u16())
        };
        body.insert("message".into(), Value::String(message));
        return body;
    }

    let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
    if is_json {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(body)) => return body,
            Ok(other) => {
                let mut body = Body::new();
                body.insert("success".into(), Value::Bool(ok));
                body.insert("data".into(), other);
                return body;
            }
            Err(e) => {
                tracing::warn!(status = status.as_u16(), text_len = text.len(), error = %e, "Failed to parse JSON response");
            }
        }
    }

    let mut body = Body::new();
    body.insert("success".into(), Value::Bool(ok));
    body.insert("message".into(), Value::String(text.to_string()));
    body.insert("raw".into(), Value::String(text.to_string()));
    body
}

/// Text describing a failed response: `error`, then `message`, then the
/// status line
#[must_use]
pub fn error_text(body: &Body, status: StatusCode) -> String {
    ["error", "message"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}

/// Decide whether a normalized body is a success
///
/// # Errors
///
/// - [`ClientError::Status`] for non-2xx responses
/// - [`ClientError::Application`] for 2xx responses with `success: false`,
///   or with an `error` key and no `success` key
pub fn interpret(status: StatusCode, body: Body) -> ClientResult<Body> {
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: error_text(&body, status),
        });
    }

    let failed = match body.get("success") {
        Some(flag) => flag.as_bool() == Some(false),
        None => body.get("error").is_some_and(|e| !e.is_null()),
    };

    if failed {
        let message = ["error", "message"]
            .iter()
            .filter_map(|key| body.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .unwrap_or("Request failed")
            .to_string();
        return Err(ClientError::Application { message });
    }

    Ok(body)
}

/// Remove `key` from the body and deserialize it
///
/// # Errors
///
/// Returns [`ClientError::Decode`] when the key is missing or has the wrong
/// shape.
pub fn take<T: DeserializeOwned>(body: &mut Body, key: &str) -> ClientResult<T> {
    let value = body.remove(key).ok_or_else(|| {
        <serde_json::Error as serde::de::Error>::custom(format!("missing field `{key}`"))
    })?;
    Ok(serde_json::from_value(value)?)
}

/// Like [`take`] but a missing or `null` key yields the default
///
/// # Errors
///
/// Returns [`ClientError::Decode`] when the key is present with the wrong
/// shape.
pub fn take_or_default<T: DeserializeOwned + Default>(body: &mut Body, key: &str) -> ClientResult<T> {
    match body.remove(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// Deserialize the whole body
///
/// # Errors
///
/// Returns [`ClientError::Decode`] when the body has the wrong shape.
pub fn into_payload<T: DeserializeOwned>(body: Body) -> ClientResult<T> {
    Ok(serde_json::from_value(Value::Object(body))?)
}

/// The human readable `message` of a successful mutation
#[must_use]
pub fn message_of(body: &Body) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("Success")
        .to_string()
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const JSON: Option<&str> = Some("application/json");

    fn object(value: Value) -> Body {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test bodies are objects"),
        }
    }

    #[test]
    fn test_success_envelope_passes_through() {
        let body = normalize(StatusCode::OK, JSON, r#"{"success": true, "data": {"total_users": 3}}"#);
        let body = interpret(StatusCode::OK, body).unwrap();
        assert_eq!(body["data"]["total_users"], 3);
    }

    #[test]
    fn test_success_false_is_application_error() {
        let body = object(json!({"success": false, "error": "Portal admin not found"}));
        let err = interpret(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ClientError::Application { ref message } if message == "Portal admin not found"));
    }

    #[test]
    fn test_success_false_with_message_only() {
        let body = object(json!({"success": false, "message": "Invalid status"}));
        let err = interpret(StatusCode::OK, body).unwrap_err();
        assert_eq!(err.to_string(), "Invalid status");
    }

    #[test]
    fn test_missing_success_key_with_payload_is_ok() {
        let body = object(json!({"organizations": []}));
        assert!(interpret(StatusCode::OK, body).is_ok());
    }

    #[test]
    fn test_missing_success_key_with_error_is_failure() {
        let body = object(json!({"error": "Username is required"}));
        let err = interpret(StatusCode::OK, body).unwrap_err();
        assert_eq!(err.to_string(), "Username is required");
    }

    #[test]
    fn test_http_error_text_precedence() {
        let both = object(json!({"error": "from error", "message": "from message"}));
        assert_eq!(error_text(&both, StatusCode::BAD_REQUEST), "from error");

        let message = object(json!({"success": false, "message": "from message"}));
        assert_eq!(error_text(&message, StatusCode::BAD_REQUEST), "from message");

        assert_eq!(error_text(&Body::new(), StatusCode::BAD_GATEWAY), "HTTP 502");
    }

    #[test]
    fn test_http_error_becomes_status_error() {
        let body = normalize(StatusCode::NOT_FOUND, JSON, r#"{"error": "Organization not found"}"#);
        let err = interpret(StatusCode::NOT_FOUND, body).unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.display_message(), "Organization not found");
    }

    #[test]
    fn test_empty_body() {
        let ok = normalize(StatusCode::NO_CONTENT, None, "");
        assert_eq!(Value::Object(ok.clone()), json!({"success": true, "message": "Success"}));
        assert!(interpret(StatusCode::NO_CONTENT, ok).is_ok());

        let failed = normalize(StatusCode::INTERNAL_SERVER_ERROR, None, "");
        let err = interpret(StatusCode::INTERNAL_SERVER_ERROR, failed).unwrap_err();
        assert_eq!(err.display_message(), "HTTP 500");
    }

    #[test]
    fn test_non_json_body_is_wrapped() {
        let body = normalize(StatusCode::BAD_GATEWAY, Some("text/html"), "<h1>Bad gateway</h1>");
        assert_eq!(body["raw"], "<h1>Bad gateway</h1>");
        let err = interpret(StatusCode::BAD_GATEWAY, body).unwrap_err();
        assert_eq!(err.display_message(), "<h1>Bad gateway</h1>");
    }

    #[test]
    fn test_json_array_is_wrapped_as_data() {
        let body = normalize(StatusCode::OK, JSON, "[1, 2]");
        assert_eq!(body["data"], json!([1, 2]));
    }

    #[test]
    fn test_take_helpers() {
        let mut body = object(json!({"users": [{"id": 1, "username": "a"}], "count": null}));
        let users: Vec<impact_core::types::UserAccount> = take(&mut body, "users").unwrap();
        assert_eq!(users.len(), 1);

        let count: u64 = take_or_default(&mut body, "count").unwrap();
        assert_eq!(count, 0);

        let missing = take::<Vec<u64>>(&mut body, "absent").unwrap_err();
        assert!(missing.to_string().contains("missing field `absent`"));
    }
}
