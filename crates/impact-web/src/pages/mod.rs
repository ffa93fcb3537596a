//! Data-fetching pages
//!
//! A page is split in two halves. [`fetch_page`] loads everything the page
//! shows and runs inside the panel poller; [`render_panel`] turns the latest
//! [`PanelState`] into the content area. Search, tabs within one payload and
//! the selected employee only affect rendering or the panel key, never the
//! shell.

pub mod admin;
pub mod portal;

use impact_client::{ApiClient, ClientError, CourseRequestList, EmployeeRoster};
use impact_core::session::{Role, Session};
use impact_core::types::{
    AnalyticsKind, CourseCatalog, EmployeeProgress, Organization, OrganizationStat,
    OrganizationStatistics, SystemStats, UserAccount,
};
use impact_refresh::{PanelState, RefreshInterval};
use serde::Deserialize;
use serde_json::Value;

use crate::analytics::{AnalyticsCache, AnalyticsTab};
use crate::components;
use crate::render::{Markup, escape};
use crate::views::{AdminPage, ConsolePage, PortalPage};

/// Query parameters every console page accepts
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    /// Search text
    pub q: Option<String>,
    /// Analytics tab
    pub tab: Option<String>,
    /// Employee whose progress is shown
    pub employee: Option<String>,
    /// Viewport width in CSS pixels
    pub vw: Option<u32>,
    /// `open` or `collapsed`
    pub sidebar: Option<String>,
    /// `notification` opens the compose form
    pub compose: Option<String>,
    /// Outcome of the last form submission
    pub notice: Option<String>,
    /// Failure of the last form submission
    pub failed: Option<String>,
}

impl PageQuery {
    /// Search text, empty when absent
    #[must_use]
    pub fn search(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }

    /// Explicit sidebar choice, if any
    #[must_use]
    pub fn sidebar_collapsed(&self) -> Option<bool> {
        match self.sidebar.as_deref() {
            Some("collapsed") => Some(true),
            Some("open") => Some(false),
            _ => None,
        }
    }

    /// Whether the notification form is open
    #[must_use]
    pub fn composing(&self) -> bool {
        self.compose.as_deref() == Some("notification")
    }
}

/// What a visible page polls
///
/// Two requests with the same key share one panel; anything that changes
/// the fetched data is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PanelRequest {
    pub page: ConsolePage,
    pub tab: Option<AnalyticsTab>,
    pub employee: Option<String>,
}

impl PanelRequest {
    /// Derive the request from a page and its query
    #[must_use]
    pub fn new(page: ConsolePage, query: &PageQuery) -> Self {
        let tab = match page {
            ConsolePage::Admin(AdminPage::Analytics) => Some(analytics_tab(query.tab.as_deref())),
            _ => None,
        };
        let employee = match page {
            ConsolePage::Portal(PortalPage::Progress) => query
                .employee
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            _ => None,
        };
        Self { page, tab, employee }
    }

    /// Panel key within one user's view session
    #[must_use]
    pub fn key(&self, username: &str) -> String {
        let mut key = format!("{username}/{}", self.page.slug());
        if let Some(tab) = self.tab {
            key.push(':');
            key.push_str(tab.as_str());
        }
        if let Some(employee) = &self.employee {
            key.push(':');
            key.push_str(employee);
        }
        key
    }

    /// Polling tier; `None` fetches once and on manual refresh
    #[must_use]
    pub const fn interval(&self) -> Option<RefreshInterval> {
        match self.page {
            ConsolePage::Admin(
                AdminPage::Dashboard | AdminPage::OrganizationList | AdminPage::TotalUsers,
            )
            | ConsolePage::Portal(PortalPage::Dashboard) => Some(RefreshInterval::Fast),
            ConsolePage::Admin(AdminPage::PortalAdmins) => Some(RefreshInterval::Standard),
            ConsolePage::Admin(AdminPage::OrganizationStats | AdminPage::Analytics) => {
                Some(RefreshInterval::Slow)
            }
            ConsolePage::Admin(_) | ConsolePage::Portal(_) => None,
        }
    }

    /// Pages without content have nothing to poll
    #[must_use]
    pub const fn needs_panel(&self) -> bool {
        self.page.is_implemented()
    }
}

/// Everything a page fetches, one variant per page
#[derive(Debug, Clone)]
pub enum PageData {
    AdminDashboard(SystemStats),
    OrganizationStats(Vec<OrganizationStat>),
    Organizations(Vec<Organization>),
    PortalAdmins(Vec<UserAccount>),
    Users(Vec<UserAccount>),
    CourseRequests(CourseRequestList),
    Analytics { tab: AnalyticsTab, report: Value },
    PortalDashboard(OrganizationStatistics),
    Employees { roster: EmployeeRoster, catalog: CourseCatalog },
    Courses(CourseCatalog),
    Progress {
        roster: EmployeeRoster,
        selected: Option<EmployeeProgress>,
    },
    PortalAnalytics(OrganizationStatistics),
}

/// Load the data of one page
///
/// The error is the single line the page shows inline.
///
/// # Errors
///
/// Returns the display message of the first failed backend call.
pub async fn fetch_page(api: &ApiClient, username: &str, request: &PanelRequest) -> Result<PageData, String> {
    let result: Result<PageData, ClientError> = match request.page {
        ConsolePage::Admin(page) => admin::fetch(api, username, page, request.tab).await,
        ConsolePage::Portal(page) => {
            portal::fetch(api, username, page, request.employee.as_deref()).await
        }
    };
    result.map_err(|e| {
        tracing::warn!(page = request.page.slug(), error = %e, "Page fetch failed");
        e.display_message()
    })
}

/// Inputs of [`render_panel`] besides the panel state
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub page: ConsolePage,
    pub query: &'a PageQuery,
    pub session: &'a Session,
    pub analytics: Option<&'a AnalyticsCache>,
}

/// Content area of a page
///
/// A failed cycle shows its message above the last good data. Before the
/// first result the page shows its loading indicator.
#[must_use]
pub fn render_panel(ctx: &PageContext<'_>, state: Option<&PanelState<PageData>>) -> Markup {
    let mut html = Markup::new();
    if let Some(notice) = ctx.query.notice.as_deref().filter(|n| !n.is_empty()) {
        html.push_raw(&format!("<div class=\"flash notice\">✅ {}</div>", escape(notice)));
    }
    if let Some(failed) = ctx.query.failed.as_deref().filter(|f| !f.is_empty()) {
        html.push_raw(&format!("<div class=\"flash failed\">⚠️ {}</div>", escape(failed)));
    }
    if ctx.query.composing() {
        html.push(&render_compose(sender_role(ctx.page), &ctx.page.href()));
    }
    if !ctx.page.is_implemented() {
        html.push(&components::coming_soon());
        return html;
    }

    let Some(state) = state else {
        html.push(&components::loading(loading_message(ctx.page)));
        return html;
    };

    if let Some(error) = &state.error {
        html.push(&components::error_banner(error));
    }
    match &state.data {
        Some(data) => html.push(&render_data(ctx, data, state.loading)),
        None if state.error.is_none() => {
            if let (Some(cache), ConsolePage::Admin(AdminPage::Analytics)) = (ctx.analytics, ctx.page) {
                let tab = PanelRequest::new(ctx.page, ctx.query).tab.unwrap_or_default();
                html.push(&admin::render_analytics(ctx, tab, cache.get(tab), true));
            } else {
                html.push(&components::loading(loading_message(ctx.page)));
            }
        }
        None => {}
    }
    html
}

fn render_data(ctx: &PageContext<'_>, data: &PageData, loading: bool) -> Markup {
    let search = ctx.query.search();
    match data {
        PageData::AdminDashboard(stats) => admin::render_dashboard(stats),
        PageData::OrganizationStats(stats) => admin::render_organization_stats(stats, search),
        PageData::Organizations(orgs) => admin::render_organizations(orgs, search),
        PageData::PortalAdmins(admins) => admin::render_portal_admins(admins, search),
        PageData::Users(users) => admin::render_users(users, search),
        PageData::CourseRequests(list) => admin::render_course_requests(list),
        PageData::Analytics { tab, report } => admin::render_analytics(ctx, *tab, Some(report), loading),
        PageData::PortalDashboard(stats) => portal::render_dashboard(stats),
        PageData::Employees { roster, catalog } => portal::render_employees(roster, catalog, search),
        PageData::Courses(catalog) => portal::render_courses(catalog, search),
        PageData::Progress { roster, selected } => {
            portal::render_progress(roster, selected.as_ref(), ctx.query)
        }
        PageData::PortalAnalytics(stats) => portal::render_analytics(stats, ctx.query),
    }
}

const fn loading_message(page: ConsolePage) -> &'static str {
    match page {
        ConsolePage::Admin(AdminPage::OrganizationStats) => "Loading organization statistics...",
        ConsolePage::Admin(AdminPage::OrganizationList) => "Loading organizations...",
        ConsolePage::Admin(AdminPage::PortalAdmins) => "Loading portal admins...",
        ConsolePage::Admin(AdminPage::TotalUsers) => "Loading users...",
        ConsolePage::Admin(AdminPage::CourseRequests) => "Loading course requests...",
        ConsolePage::Admin(AdminPage::Analytics) => "Loading analytics dashboard...",
        ConsolePage::Portal(PortalPage::Employees | PortalPage::Progress) => "Loading employees...",
        ConsolePage::Portal(PortalPage::Courses) => "Loading courses...",
        ConsolePage::Portal(PortalPage::Analytics) => "Loading analytics...",
        ConsolePage::Admin(_) | ConsolePage::Portal(_) => "Loading dashboard...",
    }
}

const fn sender_role(page: ConsolePage) -> Role {
    match page {
        ConsolePage::Admin(_) => Role::Admin,
        ConsolePage::Portal(_) => Role::PortalAdmin,
    }
}

/// Form for sending a notification from this shell
#[must_use]
pub fn render_compose(sender: Role, back: &str) -> Markup {
    let audience = match sender {
        Role::Admin => "all portal admins",
        Role::PortalAdmin | Role::Employee => "employees of your organization",
    };
    Markup::raw(format!(
        "<div class=\"section notification-form\"><h3>📢 Send Notification</h3><p>Recipients: {audience}</p>\
         <form method=\"post\" action=\"/api/notifications\">\
         <label>Title <input type=\"text\" name=\"title\" required maxlength=\"200\"></label>\
         <label>Message <textarea name=\"message\" required></textarea></label>\
         <label>Type <select name=\"type\"><option value=\"general\">General</option>\
         <option value=\"announcement\">Announcement</option><option value=\"course_new\">New course</option>\
         <option value=\"course_expiring\">Course expiring</option><option value=\"course_assigned\">Course assigned</option></select></label>\
         <label>Priority <select name=\"priority\"><option value=\"normal\">Normal</option><option value=\"low\">Low</option>\
         <option value=\"high\">High</option><option value=\"urgent\">Urgent</option></select></label>\
         <button type=\"submit\">Send</button> <a href=\"{}\">Cancel</a></form></div>",
        escape(back)
    ))
}

/// `<table>` with a header row
#[must_use]
pub fn data_table(headers: &[&str], rows: &[Vec<Markup>]) -> Markup {
    let head: String = headers
        .iter()
        .map(|h| format!("<th>{}</th>", escape(h)))
        .collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row.iter().map(|cell| format!("<td>{cell}</td>")).collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();
    Markup::raw(format!(
        "<table class=\"data-table\"><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table>"
    ))
}

/// `1` decimal place, as the tables show rates
#[must_use]
pub fn one_decimal(value: f64) -> String {
    format!("{value:.1}")
}

/// Analytics kind from an optional tab name
#[must_use]
pub fn analytics_tab(name: Option<&str>) -> AnalyticsKind {
    name.and_then(|tab| tab.parse().ok()).unwrap_or_default()
}
