//! Analytics reports under `/api/analytics`

use impact_core::types::{AnalyticsKind, ExportFormat, ExportReceipt};
use serde_json::{json, Value};
use tracing::instrument;

use crate::client::ApiClient;
use crate::envelope;
use crate::error::ClientResult;

impl ApiClient {
    /// Fetch one analytics report
    ///
    /// The report sits under `{kind}_analytics`; older backends nest it
    /// under `overview` instead. When neither key is present the whole body
    /// is returned so the page can still pick out what it understands.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn analytics(&self, kind: AnalyticsKind) -> ClientResult<Value> {
        let mut body = self.get(&format!("/api/analytics/{kind}")).await?;

        if let Some(payload) = body.remove(&kind.response_key()) {
            return Ok(payload);
        }
        Ok(body.remove("overview").unwrap_or(Value::Object(body)))
    }

    /// Ask the backend to prepare an export of one report
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn export_analytics(&self, kind: AnalyticsKind, format: ExportFormat) -> ClientResult<ExportReceipt> {
        let body = self
            .post(
                "/api/analytics/export",
                &json!({ "type": kind, "format": format }),
            )
            .await?;
        envelope::into_payload(body)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_analytics_unwraps_kind_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/analytics/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "users_analytics": {"role_distribution": [{"role": "employee", "count": 40}]}
            })))
            .mount(&server)
            .await;

        let payload = ApiClient::new(server.uri())
            .analytics(AnalyticsKind::Users)
            .await
            .unwrap();
        assert_eq!(payload["role_distribution"][0]["count"], 40);
    }

    #[tokio::test]
    async fn test_analytics_falls_back_to_overview_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/analytics/overview"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "overview": {"users": {"total": 10}}
            })))
            .mount(&server)
            .await;

        let payload = ApiClient::new(server.uri())
            .analytics(AnalyticsKind::Overview)
            .await
            .unwrap();
        assert_eq!(payload["users"]["total"], 10);
    }

    #[tokio::test]
    async fn test_export_posts_type_and_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analytics/export"))
            .and(body_json(json!({"type": "courses", "format": "excel"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Analytics export prepared: analytics_courses_20240101_000000.excel",
                "download_url": "/api/analytics/download/analytics_courses_20240101_000000.excel"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = ApiClient::new(server.uri())
            .export_analytics(AnalyticsKind::Courses, ExportFormat::Excel)
            .await
            .unwrap();
        assert!(receipt.download_url.unwrap().ends_with(".excel"));
    }
}
