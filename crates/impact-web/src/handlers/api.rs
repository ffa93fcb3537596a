//! JSON and form endpoints behind the console
//!
//! Every mutation answers JSON to scripts and a 303 back to the submitting
//! page for plain forms, then refetches the caller's open panels.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use impact_client::CourseAssignmentTarget;
use impact_core::session::Role;
use impact_core::types::{
    AnalyticsKind, CourseRequestDecision, EntityId, ExportFormat, NewOrganization,
    NotificationDraft, NotificationKind, NotificationPriority, OrgStatus, RequestAction,
};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Value, json};
use tracing::info;

use super::pages::signed_out;
use crate::error::{WebError, WebResult};
use crate::extract::{ExtractorError, Payload, ReplyMode, SessionUser};
use crate::state::SharedState;
use crate::views::Shell;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Timestamp of the check
    pub timestamp: DateTime<Utc>,
    /// Open view sessions
    pub views: usize,
    /// Running panel pollers
    pub active_panels: usize,
    /// Backend base URL
    pub backend: String,
}

/// Liveness and poller counts
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.scheduler.is_shut_down() { "stopping" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        views: state.view_count(),
        active_panels: state.scheduler.active_count(),
        backend: state.api.base_url().to_string(),
    })
}

/// Outcome of a mutation
#[derive(Debug)]
pub struct Reply {
    mode: ReplyMode,
    result: Result<String, WebError>,
    extra: Value,
}

impl Reply {
    fn new(mode: ReplyMode, result: Result<String, WebError>) -> Self {
        Self {
            mode,
            result,
            extra: Value::Null,
        }
    }

    fn with_extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }
}

/// Append a flash parameter to `back`, replacing earlier ones
#[must_use]
pub fn with_flash(back: &str, key: &str, message: &str) -> String {
    let (path, query) = back.split_once('?').unwrap_or((back, ""));
    let mut params: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            !pair.is_empty() && !pair.starts_with("notice=") && !pair.starts_with("failed=")
        })
        .collect();
    let flash = format!("{key}={}", urlencoding::encode(message));
    params.push(&flash);
    format!("{path}?{}", params.join("&"))
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match (self.mode, self.result) {
            (ReplyMode::Json, Ok(message)) => {
                let mut body = json!({ "success": true, "message": message });
                if let (Value::Object(body), Value::Object(extra)) = (&mut body, self.extra) {
                    body.extend(extra);
                }
                Json(body).into_response()
            }
            (ReplyMode::Json, Err(err)) => err.into_response(),
            (ReplyMode::Redirect { back }, Ok(message)) => {
                Redirect::to(&with_flash(&back, "notice", &message)).into_response()
            }
            (ReplyMode::Redirect { back }, Err(err)) => {
                tracing::warn!(error = %err, "Form submission failed");
                Redirect::to(&with_flash(&back, "failed", &err.to_string())).into_response()
            }
        }
    }
}

fn require(user: &SessionUser, role: Role) -> WebResult<()> {
    if user.session.role == Some(role) {
        Ok(())
    } else {
        Err(WebError::Forbidden {
            role: user.session.raw_role.clone(),
        })
    }
}

/// Reply for `result`, refetching the caller's panel when it succeeded
fn finish(state: &SharedState, user: &SessionUser, mode: ReplyMode, result: WebResult<String>) -> Reply {
    if result.is_ok() {
        state.refresh(&user.session.username);
    }
    Reply::new(mode, result)
}

/// Accept a list as a JSON array or as comma separated text
fn id_list<'de, D>(deserializer: D) -> Result<Vec<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ids {
        List(Vec<EntityId>),
        Text(String),
    }

    match Ids::deserialize(deserializer)? {
        Ids::List(ids) => Ok(ids),
        Ids::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse()
                    .map_err(|_| de::Error::custom(format!("'{part}' is not a course id")))
            })
            .collect(),
    }
}

/// Accept an optional id that forms send as an empty string
fn optional_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(EntityId),
        Text(String),
    }

    match Option::<Id>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Id::Number(id)) => Ok(Some(id)),
        Some(Id::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Id::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("'{text}' is not an id"))),
    }
}

/// Panel status polled by the browser
#[derive(Debug, Clone, Serialize)]
pub struct PanelStatus {
    /// Panel key, `None` when no such panel is open
    pub key: Option<String>,
    /// A fetch is running
    pub loading: bool,
    /// Completed fetches
    pub cycles: u64,
    /// Latest error
    pub error: Option<String>,
    /// Time of the last good fetch
    pub last_updated: Option<DateTime<Utc>>,
}

/// Which panel a tab is polling
#[derive(Debug, Default, Deserialize)]
pub struct PanelQuery {
    /// Key embedded in the rendered page; the latest panel when absent
    pub key: Option<String>,
}

/// State of one of the caller's panels
///
/// Polling also keeps the panel and its view session from being swept.
pub async fn panel_status(
    State(state): State<SharedState>,
    user: SessionUser,
    Query(query): Query<PanelQuery>,
) -> Json<PanelStatus> {
    let key = query.key.as_deref().filter(|key| !key.is_empty());
    let observed = state.observe(&user.session.username, key);
    let (key, snapshot) = match observed {
        Some((key, snapshot)) => (Some(key), Some(snapshot)),
        None => (None, None),
    };
    Json(PanelStatus {
        key,
        loading: snapshot.as_ref().is_some_and(|s| s.loading),
        cycles: snapshot.as_ref().map_or(0, |s| s.cycles),
        error: snapshot.as_ref().and_then(|s| s.error.clone()),
        last_updated: snapshot.and_then(|s| s.last_updated),
    })
}

/// Manual refresh button
pub async fn refresh_panel(State(state): State<SharedState>, user: SessionUser, mode: ReplyMode) -> Reply {
    let refreshed = state.refresh(&user.session.username);
    let message = if refreshed { "Refreshing" } else { "Nothing to refresh" };
    Reply::new(mode, Ok(message.to_string())).with_extra(json!({ "refreshed": refreshed }))
}

/// Approve or reject form
#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    /// `approve` or `reject`
    pub action: RequestAction,
    /// Notes shown to the requester
    #[serde(default)]
    pub admin_notes: String,
}

/// Decide a course purchase request
pub async fn decide_course_request(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(request_id): Path<EntityId>,
    Payload { data, mode }: Payload<DecisionForm>,
) -> Reply {
    let result: WebResult<String> = async {
        require(&user, Role::Admin)?;
        let decision = CourseRequestDecision {
            request_id,
            action: data.action,
            admin_username: user.session.username.clone(),
            admin_notes: data.admin_notes.trim().to_string(),
        };
        let message = state.client_for(&user).decide_course_request(&decision).await?;
        info!(request_id, action = ?decision.action, "Course request decided");
        Ok(message)
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Create organization form
#[derive(Debug, Deserialize)]
pub struct CreateOrganizationForm {
    /// Display name
    pub name: String,
    /// Portal admin username
    pub portal_admin: String,
    /// Email domain
    pub org_domain: String,
    /// Initial status
    #[serde(default = "default_status")]
    pub status: OrgStatus,
    /// Portal admin email
    #[serde(default)]
    pub admin_email: Option<String>,
    /// Courses to assign
    #[serde(default, deserialize_with = "id_list")]
    pub course_ids: Vec<EntityId>,
}

const fn default_status() -> OrgStatus {
    OrgStatus::Active
}

impl CreateOrganizationForm {
    fn into_new(self) -> WebResult<NewOrganization> {
        for (field, value) in [
            ("name", &self.name),
            ("portal_admin", &self.portal_admin),
            ("org_domain", &self.org_domain),
        ] {
            if value.trim().is_empty() {
                return Err(impact_core::Error::validation(field, "is required").into());
            }
        }
        Ok(NewOrganization {
            name: self.name.trim().to_string(),
            portal_admin: self.portal_admin.trim().to_string(),
            org_domain: self.org_domain.trim().to_string(),
            status: self.status,
            course_ids: self.course_ids,
            admin_email: self
                .admin_email
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty()),
        })
    }
}

/// Create an organization and its portal admin
pub async fn create_organization(
    State(state): State<SharedState>,
    user: SessionUser,
    Payload { data, mode }: Payload<CreateOrganizationForm>,
) -> Reply {
    let mut extra = Value::Null;
    let result: WebResult<String> = async {
        require(&user, Role::Admin)?;
        let organization = data.into_new()?;
        let created = state.client_for(&user).create_organization(&organization).await?;
        info!(organization_id = created.organization_id, name = %organization.name, "Organization created");
        extra = json!({
            "organization_id": created.organization_id,
            "admin_username": created.admin_username,
            "admin_email": created.admin_email,
            "email_sent": created.email_sent,
        });
        Ok(created.message)
    }
    .await;
    finish(&state, &user, mode, result).with_extra(extra)
}

/// Status change form
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    /// New status
    pub status: OrgStatus,
}

/// Change an organization's status
pub async fn set_organization_status(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(org_id): Path<EntityId>,
    Payload { data, mode }: Payload<StatusForm>,
) -> Reply {
    let result: WebResult<String> = async {
        require(&user, Role::Admin)?;
        let message = state
            .client_for(&user)
            .set_organization_status(org_id, data.status)
            .await?;
        info!(org_id, status = data.status.as_str(), "Organization status changed");
        Ok(message)
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Delete an organization
pub async fn delete_organization(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(org_id): Path<EntityId>,
    mode: ReplyMode,
) -> Reply {
    let result: WebResult<String> = async {
        require(&user, Role::Admin)?;
        let message = state.client_for(&user).delete_organization(org_id).await?;
        info!(org_id, "Organization deleted");
        Ok(message)
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Course set form
#[derive(Debug, Deserialize)]
pub struct CourseIdsForm {
    /// Courses the organization should have
    #[serde(deserialize_with = "id_list")]
    pub course_ids: Vec<EntityId>,
}

/// Replace an organization's courses
pub async fn assign_organization_courses(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(org_id): Path<EntityId>,
    Payload { data, mode }: Payload<CourseIdsForm>,
) -> Reply {
    let result: WebResult<String> = async {
        require(&user, Role::Admin)?;
        let assigned = state
            .client_for(&user)
            .assign_courses(org_id, &data.course_ids)
            .await?;
        info!(org_id, employees_updated = assigned.employees_updated, "Organization courses assigned");
        Ok(assigned.message)
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Reset a portal admin's password
pub async fn reset_portal_admin_password(
    State(state): State<SharedState>,
    user: SessionUser,
    Path(username): Path<String>,
    mode: ReplyMode,
) -> Reply {
    let result: WebResult<String> = async {
        require(&user, Role::Admin)?;
        let reset = state
            .client_for(&user)
            .reset_portal_admin_password(&username)
            .await?;
        info!(portal_admin = %username, email_sent = reset.email_sent, "Portal admin password reset");
        Ok(match reset.email_message {
            Some(email) if !email.is_empty() => format!("{} {email}", reset.message),
            _ => reset.message,
        })
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Course assignment form; no employee means everyone
#[derive(Debug, Deserialize)]
pub struct AssignmentForm {
    /// Course to assign
    pub course_id: EntityId,
    /// Employee, or `None` for every employee
    #[serde(default, deserialize_with = "optional_id")]
    pub employee_id: Option<EntityId>,
}

/// Assign a course to one employee or all of them
pub async fn assign_course(
    State(state): State<SharedState>,
    user: SessionUser,
    Payload { data, mode }: Payload<AssignmentForm>,
) -> Reply {
    let result: WebResult<String> = async {
        require(&user, Role::PortalAdmin)?;
        let target = data
            .employee_id
            .map_or(CourseAssignmentTarget::Everyone, CourseAssignmentTarget::Employee);
        let message = state.client_for(&user).assign_course(data.course_id, target).await?;
        info!(course_id = data.course_id, ?target, "Course assigned");
        Ok(message)
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Unassignment form
#[derive(Debug, Deserialize)]
pub struct UnassignmentForm {
    /// Course to remove
    pub course_id: EntityId,
    /// Employee losing the course
    pub employee_id: EntityId,
}

/// Take a course away from an employee
pub async fn unassign_course(
    State(state): State<SharedState>,
    user: SessionUser,
    Payload { data, mode }: Payload<UnassignmentForm>,
) -> Reply {
    let result: WebResult<String> = async {
        require(&user, Role::PortalAdmin)?;
        let message = state
            .client_for(&user)
            .unassign_course(data.course_id, data.employee_id)
            .await?;
        info!(course_id = data.course_id, employee_id = data.employee_id, "Course unassigned");
        Ok(message)
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Notification form
#[derive(Debug, Deserialize)]
pub struct NotificationForm {
    /// Heading
    pub title: String,
    /// Body text
    pub message: String,
    /// Category
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
    /// Urgency
    #[serde(default)]
    pub priority: NotificationPriority,
}

/// Send a notification one level down the hierarchy
pub async fn send_notification(
    State(state): State<SharedState>,
    user: SessionUser,
    Payload { data, mode }: Payload<NotificationForm>,
) -> Reply {
    let result: WebResult<String> = async {
        let sender = Shell::for_session(&user.session)
            .notification_sender()
            .ok_or_else(|| WebError::Forbidden {
                role: user.session.raw_role.clone(),
            })?;
        let mut draft = NotificationDraft::new(data.title.trim(), data.message.trim());
        draft.kind = data.kind;
        draft.priority = data.priority;
        draft.validate()?;

        let sent = state.client_for(&user).send_notification(sender, &draft).await?;
        info!(sender = sender.as_str(), recipients = sent.recipients_count, "Notification sent");
        Ok(format!("{} ({} recipients)", sent.message, sent.recipients_count))
    }
    .await;
    finish(&state, &user, mode, result)
}

/// Unread notification count
pub async fn unread_count(State(state): State<SharedState>, user: SessionUser) -> WebResult<Json<Value>> {
    let count = state.client_for(&user).unread_count().await?;
    Ok(Json(json!({ "success": true, "count": count })))
}

/// Export request form
#[derive(Debug, Deserialize)]
pub struct ExportForm {
    /// Report to export
    #[serde(rename = "type", default)]
    pub kind: AnalyticsKind,
    /// Output format
    pub format: ExportFormat,
}

/// Ask the backend to export an analytics report
pub async fn export_analytics(
    State(state): State<SharedState>,
    user: SessionUser,
    Payload { data, mode }: Payload<ExportForm>,
) -> Reply {
    let mut extra = Value::Null;
    let result: WebResult<String> = async {
        require(&user, Role::Admin)?;
        let receipt = state
            .client_for(&user)
            .export_analytics(data.kind, data.format)
            .await?;
        info!(kind = data.kind.as_str(), "Analytics export requested");
        extra = json!({ "download_url": receipt.download_url });
        Ok(match &receipt.download_url {
            Some(url) => format!("{} Download: {url}", receipt.message),
            None => receipt.message,
        })
    }
    .await;
    Reply::new(mode, result).with_extra(extra)
}

/// Close the view session and clear the cookies
pub async fn sign_out(
    State(state): State<SharedState>,
    user: Result<SessionUser, ExtractorError>,
    mode: ReplyMode,
) -> Response {
    if let Ok(user) = &user {
        state.sign_out(&user.session.username);
        info!(user = %user.session.username, "Signed out");
    }
    let response = match mode {
        ReplyMode::Json => Json(json!({ "success": true, "message": "Signed out" })).into_response(),
        ReplyMode::Redirect { .. } => Redirect::to("/console").into_response(),
    };
    signed_out(response)
}
