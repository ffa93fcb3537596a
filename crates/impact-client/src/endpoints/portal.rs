//! Portal admin routes under `/api/portal_admin`

use impact_core::types::{
    CourseCatalog, Employee, EmployeeProgress, EntityId, OrgDomain, OrganizationRef,
    OrganizationStatistics,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::client::{encode, ApiClient};
use crate::envelope;
use crate::error::ClientResult;

/// Employees of one organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeRoster {
    pub organization: Option<OrganizationRef>,
    pub employees: Vec<Employee>,
    pub total_employees: u64,
}

/// Who a course assignment change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseAssignmentTarget {
    /// One employee
    Employee(EntityId),
    /// Every employee of the caller's organization
    Everyone,
}

impl ApiClient {
    /// Resolve the portal admin's organization
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the admin has no
    /// organization.
    #[instrument(skip(self))]
    pub async fn org_domain(&self, username: &str) -> ClientResult<OrgDomain> {
        let path = format!("/api/portal_admin/org_domain?username={}", encode(username));
        let body = self.get(&path).await?;
        envelope::into_payload(body)
    }

    /// Dashboard statistics for the portal admin's organization
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is malformed.
    #[instrument(skip(self))]
    pub async fn organization_statistics(&self, username: &str) -> ClientResult<OrganizationStatistics> {
        let path = format!(
            "/api/portal_admin/organization_statistics?username={}",
            encode(username)
        );
        let body = self.get(&path).await?;
        envelope::into_payload(body)
    }

    /// Per-course progress for one employee
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the employee is outside the
    /// admin's organization.
    #[instrument(skip(self))]
    pub async fn employee_progress(&self, employee: &str, admin_username: &str) -> ClientResult<EmployeeProgress> {
        let path = format!(
            "/api/portal_admin/employee_progress/{}?username={}",
            encode(employee),
            encode(admin_username)
        );
        let body = self.get(&path).await?;
        envelope::into_payload(body)
    }

    /// Employees of an organization
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the organization is unknown.
    #[instrument(skip(self))]
    pub async fn organization_employees(&self, org_id: EntityId) -> ClientResult<EmployeeRoster> {
        let body = self
            .get(&format!("/api/portal_admin/organizations/{org_id}/employees"))
            .await?;
        envelope::into_payload(body)
    }

    /// Published courses plus those assigned to the caller's organization
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is malformed.
    #[instrument(skip(self))]
    pub async fn course_catalog(&self, username: &str) -> ClientResult<CourseCatalog> {
        let path = format!("/api/portal_admin/all_courses?username={}", encode(username));
        let body = self.get(&path).await?;
        envelope::into_payload(body)
    }

    /// Give a course to one employee or to all of them
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the course is already
    /// assigned, or the organization does not own the course.
    #[instrument(skip(self))]
    pub async fn assign_course(&self, course_id: EntityId, target: CourseAssignmentTarget) -> ClientResult<String> {
        let body = match target {
            CourseAssignmentTarget::Employee(employee_id) => {
                self.post(
                    "/api/portal_admin/assign_course_to_employee",
                    &json!({ "employee_id": employee_id, "course_id": course_id }),
                )
                .await?
            }
            CourseAssignmentTarget::Everyone => {
                self.post(
                    "/api/portal_admin/assign_course_to_all",
                    &json!({ "course_id": course_id }),
                )
                .await?
            }
        };
        Ok(envelope::message_of(&body))
    }

    /// Take a course away from one employee
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the course was not assigned.
    #[instrument(skip(self))]
    pub async fn unassign_course(&self, course_id: EntityId, employee_id: EntityId) -> ClientResult<String> {
        let body = self
            .post(
                "/api/portal_admin/unassign_course_from_employee",
                &json!({ "employee_id": employee_id, "course_id": course_id }),
            )
            .await?;
        Ok(envelope::message_of(&body))
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_org_domain_top_level_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/portal_admin/org_domain"))
            .and(query_param("username", "acme_admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "org_domain": "acme.com",
                "organization_name": "Acme",
                "organization_id": 2
            })))
            .mount(&server)
            .await;

        let domain = ApiClient::new(server.uri()).org_domain("acme_admin").await.unwrap();
        assert_eq!(domain.organization_id, 2);
        assert_eq!(domain.org_domain.as_deref(), Some("acme.com"));
    }

    #[tokio::test]
    async fn test_organization_statistics_headline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/portal_admin/organization_statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "organization": {
                    "id": 2,
                    "name": "Acme",
                    "total_employees": 30,
                    "total_courses": 4,
                    "overall_completion_rate": 55.0,
                    "employees_at_risk": 1
                },
                "course_statistics": [{"title": "Phishing 101", "enrolled_count": 30, "completion_rate": 50.0}],
                "employee_statistics": [],
                "employees_at_risk": [{"id": 9, "username": "bob", "risk_courses": []}]
            })))
            .mount(&server)
            .await;

        let stats = ApiClient::new(server.uri())
            .organization_statistics("acme_admin")
            .await
            .unwrap();
        let headline = stats.headline();
        assert_eq!(headline.total_employees, 30);
        assert_eq!(headline.completion_percent, 55.0);
        assert_eq!(stats.course_statistics.len(), 1);
    }

    #[tokio::test]
    async fn test_employee_progress_path_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/portal_admin/employee_progress/jane"))
            .and(query_param("username", "acme_admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "employee": {"username": "jane", "email": "jane@acme.com"},
                "courses": [{
                    "course_id": 1,
                    "course_title": "Phishing 101",
                    "progress_percentage": 80.0,
                    "completed_modules": 4,
                    "total_modules": 5,
                    "completed": false
                }],
                "average_progress": 80.0,
                "total_courses": 1,
                "completed_courses": 0
            })))
            .mount(&server)
            .await;

        let progress = ApiClient::new(server.uri())
            .employee_progress("jane", "acme_admin")
            .await
            .unwrap();
        assert_eq!(progress.employee.username, "jane");
        assert_eq!(progress.courses[0].completed_modules, 4);
    }

    #[tokio::test]
    async fn test_organization_employees_roster() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/portal_admin/organizations/2/employees"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organization": {"id": 2, "name": "Acme"},
                "employees": [{"id": 7, "name": "jane", "email": "jane@acme.com", "designation": "Analyst"}],
                "total_employees": 1
            })))
            .mount(&server)
            .await;

        let roster = ApiClient::new(server.uri()).organization_employees(2).await.unwrap();
        assert_eq!(roster.total_employees, 1);
        assert_eq!(roster.employees[0].name, "jane");
    }

    #[tokio::test]
    async fn test_course_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/portal_admin/all_courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "all_courses": [
                    {"id": 1, "title": "Phishing 101", "module_count": 5, "is_assigned": true},
                    {"id": 2, "title": "Passwords", "price": 20.0, "is_pending_request": true}
                ],
                "assigned_courses": [{"id": 1, "title": "Phishing 101"}],
                "organization": {"id": 2, "name": "Acme"}
            })))
            .mount(&server)
            .await;

        let catalog = ApiClient::new(server.uri()).course_catalog("acme_admin").await.unwrap();
        assert_eq!(catalog.all_courses.len(), 2);
        assert!(catalog.all_courses[1].is_pending_request);
        assert_eq!(catalog.assigned_courses.len(), 1);
    }

    #[tokio::test]
    async fn test_assignment_routes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/portal_admin/assign_course_to_employee"))
            .and(body_json(json!({"employee_id": 7, "course_id": 1})))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "error": "Course already assigned to employee"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/portal_admin/assign_course_to_all"))
            .and(body_json(json!({"course_id": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Course \"Phishing 101\" assigned to 3 employees in Acme",
                "assigned_count": 3
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/portal_admin/unassign_course_from_employee"))
            .and(body_json(json!({"employee_id": 7, "course_id": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Course unassigned from employee"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());

        let err = client
            .assign_course(1, CourseAssignmentTarget::Employee(7))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.display_message(), "Course already assigned to employee");

        let message = client.assign_course(1, CourseAssignmentTarget::Everyone).await.unwrap();
        assert!(message.contains("3 employees"));

        let message = client.unassign_course(1, 7).await.unwrap();
        assert_eq!(message, "Course unassigned from employee");
    }
}
