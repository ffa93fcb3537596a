//! View models for data fetched from the LMS backend
//!
//! Every struct here is a read-mostly projection of backend state. Fields the
//! backend may omit or send as `null` are optional or defaulted so that a
//! partially populated payload still renders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend primary key type
pub type EntityId = i64;

/// Organization lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgStatus {
    /// Tenant is live
    Active,
    /// Tenant is disabled by its owner
    Inactive,
    /// Tenant is blocked by a super admin
    Suspended,
    /// Any value this console does not know about
    #[serde(other)]
    Unknown,
}

impl OrgStatus {
    /// Values an admin may set through the status endpoint
    pub const SETTABLE: [Self; 3] = [Self::Active, Self::Inactive, Self::Suspended];

    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OrgStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            other => Err(crate::Error::validation(
                "status",
                format!("'{other}' is not one of active, inactive, suspended"),
            )),
        }
    }
}

/// Minimal course reference embedded in other payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRef {
    /// Course id
    pub id: EntityId,
    /// Course title
    #[serde(default)]
    pub title: String,
    /// Description, present on course request payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Organization summary embedded in user and request payloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    /// Organization id
    #[serde(default)]
    pub id: Option<EntityId>,
    /// Organization display name
    #[serde(default)]
    pub name: String,
    /// Email domain
    #[serde(default)]
    pub domain: Option<String>,
    /// Raw status string
    #[serde(default)]
    pub status: Option<String>,
}

/// A tenant organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization id
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Email domain used to validate employee addresses
    #[serde(rename = "org_domain", alias = "domain", default)]
    pub domain: Option<String>,
    /// Current status
    #[serde(default)]
    pub status: Option<OrgStatus>,
    /// Username of the tenant's portal admin
    #[serde(default)]
    pub portal_admin: Option<String>,
    /// Creation date as sent by the backend (`YYYY-MM-DD`)
    #[serde(default)]
    pub created: Option<String>,
    /// Courses assigned to the tenant
    #[serde(default)]
    pub courses: Vec<CourseRef>,
}

/// Payload for creating an organization together with its portal admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    /// Display name
    pub name: String,
    /// Username for the portal admin account created alongside
    pub portal_admin: String,
    /// Email domain
    pub org_domain: String,
    /// Initial status
    pub status: OrgStatus,
    /// Courses to assign immediately
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub course_ids: Vec<EntityId>,
    /// Portal admin email, defaults upstream to `portal_admin@org_domain`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
}

/// A course as listed to a portal admin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Course id
    pub id: EntityId,
    /// Title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Publication status (`draft`, `published`)
    #[serde(default)]
    pub status: Option<String>,
    /// Number of modules
    #[serde(default)]
    pub module_count: u32,
    /// Purchase price
    #[serde(default)]
    pub price: Option<f64>,
    /// Whether the caller's organization already has the course
    #[serde(default)]
    pub is_assigned: bool,
    /// Whether a purchase request is waiting for approval
    #[serde(default)]
    pub is_pending_request: bool,
}

/// Catalogue returned to a portal admin: everything purchasable plus what
/// the organization already owns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseCatalog {
    /// Every published course
    #[serde(default)]
    pub all_courses: Vec<Course>,
    /// Courses assigned to the organization
    #[serde(default)]
    pub assigned_courses: Vec<Course>,
    /// The caller's organization
    #[serde(default)]
    pub organization: Option<OrganizationRef>,
}

/// A user account as listed to a super admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// User id
    pub id: EntityId,
    /// Login name
    pub username: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Raw role string
    #[serde(default)]
    pub role: Option<String>,
    /// Job title
    #[serde(default)]
    pub designation: Option<String>,
    /// Owning organization, absent for super admins
    #[serde(default)]
    pub organization: Option<OrganizationRef>,
    /// Creation timestamp (ISO 8601)
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An employee of the portal admin's organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// User id
    pub id: EntityId,
    /// Login name
    #[serde(alias = "username")]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Job title
    #[serde(default)]
    pub designation: Option<String>,
}

/// Person reference embedded in course requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    /// User id
    pub id: EntityId,
    /// Login name
    pub username: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
}

/// Review state of a course purchase request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for a super admin
    Pending,
    /// Course granted to the organization
    Approved,
    /// Request declined
    Rejected,
    /// Any value this console does not know about
    #[serde(other)]
    Unknown,
}

impl RequestStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision taken on a pending course request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    /// Grant the course
    Approve,
    /// Decline the request
    Reject,
}

impl RequestAction {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for RequestAction {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(crate::Error::validation(
                "action",
                format!("'{other}' is not approve or reject"),
            )),
        }
    }
}

/// A portal admin's request to purchase a course for their organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRequest {
    /// Request id
    pub id: EntityId,
    /// Requesting organization
    pub organization: OrganizationRef,
    /// Requested course
    pub course: CourseRef,
    /// Portal admin who asked
    pub requester: PersonRef,
    /// Quoted price
    #[serde(default)]
    pub payment_amount: Option<f64>,
    /// Review state
    pub status: RequestStatus,
    /// Submission time (`YYYY-MM-DD HH:MM:SS`)
    #[serde(default)]
    pub requested_at: Option<String>,
    /// Reviewer notes
    #[serde(default)]
    pub admin_notes: Option<String>,
    /// Reviewer username
    #[serde(default)]
    pub approved_by: Option<String>,
    /// Review time
    #[serde(default)]
    pub approved_at: Option<String>,
}

/// Body of the approve/reject call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRequestDecision {
    /// Request being decided
    pub request_id: EntityId,
    /// Approve or reject
    pub action: RequestAction,
    /// Acting super admin
    pub admin_username: String,
    /// Free-form notes shown to the requester
    #[serde(default)]
    pub admin_notes: String,
}

/// Recently created organization listed on the system stats payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentOrganization {
    /// Organization id
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Raw status
    #[serde(default)]
    pub status: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created: Option<String>,
}

/// One bucket of the monthly user growth series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// Short month name
    pub month: String,
    /// Users created that month
    pub count: u64,
}

/// Counters behind the admin and portal admin dashboards
///
/// Super admins receive the system-wide fields; portal admins receive the
/// organization-scoped ones. Whatever is absent stays zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_portal_admins: u64,
    pub total_employees: u64,
    pub total_courses: u64,
    pub total_organizations: u64,
    pub active_organizations: u64,
    pub recent_users: u64,
    pub recent_courses: u64,
    pub completion_rate: f64,
    pub avg_quiz_score: f64,
    pub employee_count: u64,
    pub active_courses: u64,
    pub recent_organizations: Vec<RecentOrganization>,
    pub monthly_user_growth: Vec<MonthlyCount>,
}

/// Risk bucket counts for an organization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskDistribution {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Per-organization learning and risk statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationStat {
    pub org_id: EntityId,
    pub org_name: String,
    pub status: String,
    pub created_date: String,
    pub total_employees: u64,
    pub total_completions: u64,
    pub avg_risk_score: f64,
    pub courses_completed: u64,
    pub in_progress_courses: u64,
    pub completion_rate: f64,
    pub risk_distribution: RiskDistribution,
    /// Fields not modelled above, kept for the JSON panel endpoint
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Tenant lookup for a portal admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgDomain {
    /// Email domain
    #[serde(default)]
    pub org_domain: Option<String>,
    /// Organization display name
    pub organization_name: String,
    /// Organization id
    pub organization_id: EntityId,
}

/// A course an at-risk employee is struggling with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCourse {
    /// Course id
    pub course_id: EntityId,
    /// Course title
    #[serde(default)]
    pub title: String,
    /// Progress percent
    #[serde(default)]
    pub progress: f64,
    /// Risk score
    #[serde(default)]
    pub risk_score: f64,
}

/// Employee flagged as at risk on at least one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeAtRisk {
    /// User id
    pub id: EntityId,
    /// Login name
    pub username: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Courses driving the flag
    #[serde(default)]
    pub risk_courses: Vec<RiskCourse>,
}

/// Organization header of the portal admin statistics payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationSummary {
    pub id: Option<EntityId>,
    pub name: String,
    pub total_employees: u64,
    pub total_courses: u64,
    pub overall_completion_rate: f64,
    pub employees_at_risk: u64,
}

/// Alternate totals block some backend versions send under `data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalTotals {
    pub total_employees: u64,
    pub avg_progress: f64,
    pub offered_courses: Vec<serde_json::Value>,
}

/// Portal admin dashboard payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationStatistics {
    pub organization: Option<OrganizationSummary>,
    pub data: Option<PortalTotals>,
    /// Per-course records (`title`, `enrolled_count`, `completion_rate`, ...)
    pub course_statistics: Vec<serde_json::Value>,
    /// Per-employee records
    pub employee_statistics: Vec<serde_json::Value>,
    pub employees_at_risk: Vec<EmployeeAtRisk>,
}

/// Headline numbers of the portal admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortalHeadline {
    /// Employees flagged at risk
    pub employees_at_risk: u64,
    /// Overall completion or average progress percent
    pub completion_percent: f64,
    /// Courses available to the organization
    pub assigned_courses: u64,
    /// Employees in the organization
    pub total_employees: u64,
}

impl OrganizationStatistics {
    /// Collapse the two payload layouts into one set of headline numbers
    ///
    /// The `organization` block wins when present; the legacy `data` block
    /// fills the gaps.
    #[must_use]
    pub fn headline(&self) -> PortalHeadline {
        let legacy = self.data.clone().unwrap_or_default();
        match &self.organization {
            Some(org) => PortalHeadline {
                employees_at_risk: org.employees_at_risk.max(self.employees_at_risk.len() as u64),
                completion_percent: org.overall_completion_rate,
                assigned_courses: org.total_courses,
                total_employees: org.total_employees,
            },
            None => PortalHeadline {
                employees_at_risk: self.employees_at_risk.len() as u64,
                completion_percent: legacy.avg_progress,
                assigned_courses: legacy.offered_courses.len() as u64,
                total_employees: legacy.total_employees,
            },
        }
    }
}

/// Progress of one employee on one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    /// Course id
    pub course_id: EntityId,
    /// Course title
    #[serde(default)]
    pub course_title: String,
    /// Percent complete
    #[serde(default)]
    pub progress_percentage: f64,
    /// Modules finished
    #[serde(default)]
    pub completed_modules: u32,
    /// Modules in the course
    #[serde(default)]
    pub total_modules: u32,
    /// Average quiz score
    #[serde(default)]
    pub quiz_score: f64,
    /// Last activity timestamp
    #[serde(default)]
    pub last_accessed: Option<String>,
    /// Whether the course is finished
    #[serde(default)]
    pub completed: bool,
}

/// Employee header of a progress report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeProfile {
    pub username: String,
    pub email: Option<String>,
    pub designation: Option<String>,
}

/// Detailed progress report for one employee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeProgress {
    pub employee: EmployeeProfile,
    pub courses: Vec<CourseProgress>,
    pub average_progress: f64,
    pub total_courses: u64,
    pub completed_courses: u64,
}

/// Notification category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Plain message
    #[default]
    General,
    /// A new course is available
    CourseNew,
    /// A course licence is about to expire
    CourseExpiring,
    /// A course was assigned to the recipient
    CourseAssigned,
    /// Organization-wide announcement
    Announcement,
}

/// Notification urgency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Informational
    Low,
    /// Default
    #[default]
    Normal,
    /// Highlighted
    High,
    /// Highlighted and pinned
    Urgent,
}

/// Outgoing notification
///
/// An empty `recipient_ids` list addresses everyone the sender may reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    /// Headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Category
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    /// Urgency
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Related course
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<EntityId>,
    /// Restrict to one organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<EntityId>,
    /// Deep link opened from the notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// Expiry timestamp (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Explicit recipients
    #[serde(default)]
    pub recipient_ids: Vec<EntityId>,
}

impl NotificationDraft {
    /// Start a general, normal-priority notification to everyone
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::default(),
            priority: NotificationPriority::default(),
            course_id: None,
            organization_id: None,
            action_url: None,
            expires_at: None,
            recipient_ids: Vec::new(),
        }
    }

    /// Reject drafts the backend would refuse
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] when the title or message is blank.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::validation("title", "Title is required"));
        }
        if self.message.trim().is_empty() {
            return Err(crate::Error::validation("message", "Message is required"));
        }
        Ok(())
    }
}

/// Analytics report families served under `/api/analytics/{kind}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsKind {
    /// Headline counters across the platform
    #[default]
    Overview,
    /// Registrations, roles, activity
    Users,
    /// Popularity, completion, time spent
    Courses,
    /// Tenant sizes and assignments
    Organizations,
    /// Quiz trends and learner engagement
    Learning,
    /// Page views, API usage, host metrics
    System,
    /// Revenue reporting
    Financial,
    /// Certification tracking
    Compliance,
}

impl AnalyticsKind {
    /// Every kind, in tab order
    pub const ALL: [Self; 8] = [
        Self::Overview,
        Self::Users,
        Self::Courses,
        Self::Organizations,
        Self::Learning,
        Self::System,
        Self::Financial,
        Self::Compliance,
    ];

    /// Path segment and wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Users => "users",
            Self::Courses => "courses",
            Self::Organizations => "organizations",
            Self::Learning => "learning",
            Self::System => "system",
            Self::Financial => "financial",
            Self::Compliance => "compliance",
        }
    }

    /// Key the backend nests the report under
    #[must_use]
    pub fn response_key(self) -> String {
        format!("{}_analytics", self.as_str())
    }
}

impl fmt::Display for AnalyticsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyticsKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::Error::NotFound {
                resource: format!("analytics tab '{s}'"),
            })
    }
}

/// File format for analytics exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma separated values
    Csv,
    /// Spreadsheet
    Excel,
}

impl FromStr for ExportFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "excel" | "xlsx" => Ok(Self::Excel),
            other => Err(crate::Error::validation(
                "format",
                format!("'{other}' is not csv or excel"),
            )),
        }
    }
}

/// Result of an export request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportReceipt {
    pub message: String,
    pub download_url: Option<String>,
}

/// Fresh token pair from the refresh endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// New access token
    #[serde(alias = "token")]
    pub access_token: String,
    /// New refresh token
    pub refresh_token: String,
}
