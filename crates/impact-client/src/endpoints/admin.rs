//! Super admin routes under `/api/admin`

use impact_core::types::{CourseRequest, CourseRequestDecision, OrganizationStat, SystemStats, UserAccount};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::client::{encode, ApiClient};
use crate::envelope;
use crate::error::ClientResult;

/// All course purchase requests, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseRequestList {
    pub requests: Vec<CourseRequest>,
    pub total_requests: u64,
    pub pending_requests: u64,
}

/// Outcome of a portal admin password reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordReset {
    pub message: String,
    pub email_sent: bool,
    pub email_message: Option<String>,
}

impl ApiClient {
    /// Platform-wide counters for the admin dashboard, or organization
    /// counters when called by a portal admin
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload lacks `data`.
    #[instrument(skip(self))]
    pub async fn system_stats(&self) -> ClientResult<SystemStats> {
        let mut body = self.get("/api/admin/system_stats").await?;
        envelope::take(&mut body, "data")
    }

    /// Learning and risk statistics for every organization
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload lacks `data`.
    #[instrument(skip(self))]
    pub async fn org_stats(&self) -> ClientResult<Vec<OrganizationStat>> {
        let mut body = self.get("/api/admin/org_stats").await?;
        envelope::take(&mut body, "data")
    }

    /// Every user account; `username` must be a super admin
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload lacks `users`.
    #[instrument(skip(self))]
    pub async fn all_users(&self, username: &str) -> ClientResult<Vec<UserAccount>> {
        let path = format!("/api/admin/all_users?username={}", encode(username));
        let mut body = self.get(&path).await?;
        envelope::take(&mut body, "users")
    }

    /// Every portal admin with their organization
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload lacks
    /// `portal_admins`.
    #[instrument(skip(self))]
    pub async fn portal_admins(&self, username: &str) -> ClientResult<Vec<UserAccount>> {
        let path = format!("/api/admin/portal_admins?username={}", encode(username));
        let mut body = self.get(&path).await?;
        envelope::take(&mut body, "portal_admins")
    }

    /// Course purchase requests awaiting or past review
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is malformed.
    #[instrument(skip(self))]
    pub async fn course_requests(&self) -> ClientResult<CourseRequestList> {
        let body = self.get("/api/admin/course_requests").await?;
        envelope::into_payload(body)
    }

    /// Approve or reject a course request, returning the backend's message
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend refuses the
    /// decision.
    #[instrument(skip(self), fields(request_id = decision.request_id, action = decision.action.as_str()))]
    pub async fn decide_course_request(&self, decision: &CourseRequestDecision) -> ClientResult<String> {
        let body = self.post("/api/admin/approve_course_request", decision).await?;
        Ok(envelope::message_of(&body))
    }

    /// Generate a new password for a portal admin and email it to them
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the portal admin is unknown.
    #[instrument(skip(self))]
    pub async fn reset_portal_admin_password(&self, portal_admin_username: &str) -> ClientResult<PasswordReset> {
        let body = self
            .post(
                "/api/admin/reset_portal_admin_password",
                &json!({ "portal_admin_username": portal_admin_username }),
            )
            .await?;
        envelope::into_payload(body)
    }
}
