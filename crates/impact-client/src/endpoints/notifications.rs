//! Outgoing notifications and the unread badge

use impact_core::session::Role;
use impact_core::types::NotificationDraft;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::ApiClient;
use crate::envelope;
use crate::error::{ClientError, ClientResult};

/// Delivery summary of a sent notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSent {
    pub message: String,
    pub recipients_count: u64,
}

impl ApiClient {
    /// Send a notification down one level of the hierarchy
    ///
    /// Admins reach portal admins; portal admins reach their employees.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Invalid`] for a blank draft or a sender role
    /// that cannot notify anyone, otherwise any backend failure.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn send_notification(&self, sender: Role, draft: &NotificationDraft) -> ClientResult<NotificationSent> {
        draft.validate()?;

        let path = match sender {
            Role::Admin => "/api/admin/send_notification_to_portal_admins",
            Role::PortalAdmin => "/api/portal_admin/send_notification_to_employees",
            Role::Employee => {
                return Err(ClientError::Invalid(impact_core::Error::UnauthorizedRole {
                    role: sender.to_string(),
                }));
            }
        };

        let body = self.post(path, draft).await?;
        envelope::into_payload(body)
    }

    /// Unread notifications for the current token
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn unread_count(&self) -> ClientResult<u64> {
        let mut body = self.get("/api/notifications/unread_count").await?;
        envelope::take_or_default(&mut body, "unread_count")
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_admin_sends_to_portal_admins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/send_notification_to_portal_admins"))
            .and(body_partial_json(json!({"title": "Audit", "type": "general", "priority": "normal"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Notification sent to 3 portal admin(s)",
                "recipients_count": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sent = ApiClient::new(server.uri())
            .send_notification(Role::Admin, &NotificationDraft::new("Audit", "Quarterly audit next week"))
            .await
            .unwrap();
        assert_eq!(sent.recipients_count, 3);
    }

    #[tokio::test]
    async fn test_portal_admin_route_and_no_recipients() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/portal_admin/send_notification_to_employees"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": "No employees found"
            })))
            .mount(&server)
            .await;

        let err = ApiClient::new(server.uri())
            .send_notification(Role::PortalAdmin, &NotificationDraft::new("Hi", "Welcome"))
            .await
            .unwrap_err();
        assert_eq!(err.display_message(), "No employees found");
    }

    #[tokio::test]
    async fn test_blank_draft_and_employee_sender_never_reach_backend() {
        let client = ApiClient::new("http://127.0.0.1:9");

        let err = client
            .send_notification(Role::Admin, &NotificationDraft::new("", "body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));

        let err = client
            .send_notification(Role::Employee, &NotificationDraft::new("t", "m"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unauthorized role: employee"));
    }

    #[tokio::test]
    async fn test_unread_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/unread_count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "unread_count": 4})))
            .mount(&server)
            .await;

        assert_eq!(ApiClient::new(server.uri()).unread_count().await.unwrap(), 4);
    }
}
