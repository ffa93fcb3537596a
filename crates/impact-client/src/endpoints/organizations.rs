//! Tenant management routes under `/api/organizations`

use impact_core::types::{EntityId, NewOrganization, OrgStatus, Organization};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::client::ApiClient;
use crate::envelope;
use crate::error::{ClientError, ClientResult};

/// Organization and portal admin account created together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationCreated {
    pub message: String,
    pub organization_id: EntityId,
    pub admin_username: String,
    pub admin_email: String,
    pub email_sent: bool,
}

/// Result of replacing an organization's course set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoursesAssigned {
    pub message: String,
    pub assigned_course_ids: Vec<EntityId>,
    pub employees_updated: u64,
}

fn ensure_settable(status: OrgStatus) -> ClientResult<()> {
    if OrgStatus::SETTABLE.contains(&status) {
        Ok(())
    } else {
        Err(ClientError::Invalid(impact_core::Error::validation(
            "status",
            "Invalid status",
        )))
    }
}

impl ApiClient {
    /// Every organization, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload lacks
    /// `organizations`.
    #[instrument(skip(self))]
    pub async fn organizations(&self) -> ClientResult<Vec<Organization>> {
        let mut body = self.get("/api/organizations").await?;
        envelope::take(&mut body, "organizations")
    }

    /// Create an organization and its portal admin account
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Invalid`] for blank required fields or an
    /// unsettable status, otherwise any backend failure such as a duplicate
    /// name.
    #[instrument(skip(self, organization), fields(name = %organization.name))]
    pub async fn create_organization(&self, organization: &NewOrganization) -> ClientResult<OrganizationCreated> {
        let required = [
            ("name", &organization.name),
            ("portal_admin", &organization.portal_admin),
            ("org_domain", &organization.org_domain),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(impact_core::Error::validation(*field, "Missing required field").into());
        }
        ensure_settable(organization.status)?;

        let body = self.post("/api/organizations", organization).await?;
        envelope::into_payload(body)
    }

    /// Delete an organization together with its users and their history
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the organization is unknown.
    #[instrument(skip(self))]
    pub async fn delete_organization(&self, org_id: EntityId) -> ClientResult<String> {
        let body = self.delete(&format!("/api/organizations/{org_id}")).await?;
        Ok(envelope::message_of(&body))
    }

    /// Set an organization's status
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Invalid`] for [`OrgStatus::Unknown`], otherwise
    /// any backend failure.
    #[instrument(skip(self))]
    pub async fn set_organization_status(&self, org_id: EntityId, status: OrgStatus) -> ClientResult<String> {
        ensure_settable(status)?;
        let body = self
            .patch(
                &format!("/api/organizations/{org_id}/status"),
                &json!({ "status": status }),
            )
            .await?;
        Ok(envelope::message_of(&body))
    }

    /// Replace the organization's courses; the backend syncs every employee
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the organization is unknown.
    #[instrument(skip(self))]
    pub async fn assign_courses(&self, org_id: EntityId, course_ids: &[EntityId]) -> ClientResult<CoursesAssigned> {
        let body = self
            .post(
                &format!("/api/organizations/{org_id}/assign_courses"),
                &json!({ "course_ids": course_ids }),
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

    fn new_org(status: OrgStatus) -> NewOrganization {
        NewOrganization {
            name: "Acme".to_string(),
            portal_admin: "acme_admin".to_string(),
            org_domain: "acme.com".to_string(),
            status,
            course_ids: vec![1, 2],
            admin_email: None,
        }
    }

    #[tokio::test]
    async fn test_organizations_without_success_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/organizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organizations": [{
                    "id": 1,
                    "name": "Acme",
                    "portal_admin": "acme_admin",
                    "org_domain": "acme.com",
                    "created": "2024-01-02",
                    "status": "suspended",
                    "courses": [{"id": 4, "title": "Passwords"}]
                }]
            })))
            .mount(&server)
            .await;

        let orgs = ApiClient::new(server.uri()).organizations().await.unwrap();
        assert_eq!(orgs[0].status, Some(OrgStatus::Suspended));
        assert_eq!(orgs[0].courses[0].title, "Passwords");
    }

    #[tokio::test]
    async fn test_create_organization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/organizations"))
            .and(body_json(json!({
                "name": "Acme",
                "portal_admin": "acme_admin",
                "org_domain": "acme.com",
                "status": "active",
                "course_ids": [1, 2]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Organization and portal admin created successfully",
                "organization_id": 11,
                "admin_username": "acme_admin",
                "admin_email": "acme_admin@acme.com",
                "admin_password": "portaladmin123",
                "email_sent": true
            })))
            .mount(&server)
            .await;

        let created = ApiClient::new(server.uri())
            .create_organization(&new_org(OrgStatus::Active))
            .await
            .unwrap();
        assert_eq!(created.organization_id, 11);
        assert_eq!(created.admin_email, "acme_admin@acme.com");
    }

    #[tokio::test]
    async fn test_create_organization_duplicate_uses_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/organizations"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "message": "Organization already exists"
            })))
            .mount(&server)
            .await;

        let err = ApiClient::new(server.uri())
            .create_organization(&new_org(OrgStatus::Inactive))
            .await
            .unwrap_err();
        assert_eq!(err.display_message(), "Organization already exists");
    }

    #[tokio::test]
    async fn test_create_organization_rejects_blank_fields_locally() {
        let mut org = new_org(OrgStatus::Active);
        org.org_domain = "  ".to_string();

        let err = ApiClient::new("http://127.0.0.1:9")
            .create_organization(&org)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));
        assert!(err.to_string().contains("org_domain"));
    }

    #[tokio::test]
    async fn test_set_status_patches() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/organizations/3/status"))
            .and(body_json(json!({"status": "suspended"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Organization status updated to suspended",
                "status": "suspended"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let message = ApiClient::new(server.uri())
            .set_organization_status(3, OrgStatus::Suspended)
            .await
            .unwrap();
        assert_eq!(message, "Organization status updated to suspended");
    }

    #[tokio::test]
    async fn test_set_status_rejects_unknown() {
        let err = ApiClient::new("http://127.0.0.1:9")
            .set_organization_status(3, OrgStatus::Unknown)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_delete_and_assign() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/organizations/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Organization deleted"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/organizations/3/assign_courses"))
            .and(body_json(json!({"course_ids": [4, 5]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Courses assigned to organization and 12 employees",
                "assigned_course_ids": [4, 5],
                "employees_updated": 12
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        assert_eq!(client.delete_organization(3).await.unwrap(), "Organization deleted");

        let assigned = client.assign_courses(3, &[4, 5]).await.unwrap();
        assert_eq!(assigned.assigned_course_ids, vec![4, 5]);
        assert_eq!(assigned.employees_updated, 12);
    }
}
