//! Super admin pages

use impact_client::{ApiClient, ClientError, ClientResult, CourseRequestList};
use impact_core::search;
use impact_core::types::{
    CourseRequest, OrgStatus, Organization, OrganizationStat, RequestStatus, SystemStats,
    UserAccount,
};
use serde_json::Value;

use super::{PageContext, PageData, data_table, one_decimal};
use crate::analytics::{self, AnalyticsTab};
use crate::cards::render_empty_card;
use crate::components::{self, ChartKind, StatTile};
use crate::render::{Markup, escape, format_float};
use crate::views::AdminPage;

/// Fetch the data of one admin page
///
/// # Errors
///
/// Returns the first failed backend call.
pub(super) async fn fetch(
    api: &ApiClient,
    username: &str,
    page: AdminPage,
    tab: Option<AnalyticsTab>,
) -> ClientResult<PageData> {
    let data = match page {
        AdminPage::Dashboard => PageData::AdminDashboard(api.system_stats().await?),
        AdminPage::OrganizationStats => PageData::OrganizationStats(api.org_stats().await?),
        AdminPage::OrganizationList => PageData::Organizations(api.organizations().await?),
        AdminPage::PortalAdmins => PageData::PortalAdmins(api.portal_admins(username).await?),
        AdminPage::TotalUsers => PageData::Users(api.all_users(username).await?),
        AdminPage::CourseRequests => PageData::CourseRequests(api.course_requests().await?),
        AdminPage::Analytics => {
            let tab = tab.unwrap_or_default();
            PageData::Analytics {
                tab,
                report: api.analytics(tab).await?,
            }
        }
        AdminPage::Courses | AdminPage::Simulations | AdminPage::Settings | AdminPage::Payment => {
            return Err(ClientError::Invalid(impact_core::Error::NotFound {
                resource: format!("{} page data", page.slug()),
            }));
        }
    };
    Ok(data)
}

/// Headline tiles, quick actions and recent organizations
#[must_use]
pub fn render_dashboard(stats: &SystemStats) -> Markup {
    let tiles = [
        StatTile::new("Total Users", stats.total_users).linked("/console/total_users"),
        StatTile::new("Active Users", stats.active_users).linked("/console/total_users"),
        StatTile::new("Total Courses", stats.total_courses).linked("/console/courses"),
        StatTile::new("Organizations", stats.total_organizations).linked("/console/organization_list"),
        StatTile::new("Completion Rate", format!("{}%", format_float(stats.completion_rate)))
            .linked("/console/analytics"),
        StatTile::new("Avg Quiz Score", format!("{}%", format_float(stats.avg_quiz_score)))
            .linked("/console/analytics"),
    ];

    let mut html = Markup::raw("<div class=\"admin-dashboard\">");
    html.push(&components::stat_grid(&tiles));

    html.push_raw("<div class=\"section quick-actions\"><h2>Quick Actions</h2><div class=\"actions-grid\">");
    for (label, href) in [
        ("Add New Course", "/console/courses"),
        ("Manage Users", "/console/total_users"),
        ("Organizations", "/console/organization_list"),
        ("View Analytics", "/console/analytics"),
        ("Simulations", "/console/simulations"),
        ("Course Requests", "/console/courses_requests"),
    ] {
        html.push_raw(&format!("<a class=\"quick-action\" href=\"{href}\">{label}</a>"));
    }
    html.push_raw("</div></div>");

    if stats.recent_organizations.is_empty() {
        html.push(&render_empty_card("Recent Organizations", "data-card"));
    } else {
        let rows: Vec<Vec<Markup>> = stats
            .recent_organizations
            .iter()
            .map(|org| {
                vec![
                    Markup::text(&org.name),
                    Markup::text(org.status.as_deref().unwrap_or_default()),
                    Markup::text(org.created.as_deref().unwrap_or_default()),
                ]
            })
            .collect();
        html.push_raw("<div class=\"section\"><h3>Recent Organizations</h3>");
        html.push(&data_table(&["Organization", "Status", "Created"], &rows));
        html.push_raw("</div>");
    }

    let growth: Vec<Value> = stats
        .monthly_user_growth
        .iter()
        .map(|point| serde_json::json!({ "month": point.month, "count": point.count }))
        .collect();
    html.push(&components::chart_placeholder(
        ChartKind::Bar,
        "Monthly User Growth",
        &growth,
        "month",
        "count",
    ));
    html.push_raw("</div>");
    html
}

/// Risk band of an average risk score
#[must_use]
pub fn risk_class(score: f64) -> &'static str {
    if score >= 8.0 {
        "high-risk"
    } else if score >= 5.0 {
        "medium-risk"
    } else {
        "low-risk"
    }
}

/// Courses an organization was assigned, derived from completions and rate
///
/// A zero rate gives 0 rather than dividing by it.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn implied_course_total(completed: u64, completion_rate: f64) -> u64 {
    if completion_rate <= 0.0 || !completion_rate.is_finite() {
        return 0;
    }
    (completed as f64 / (completion_rate / 100.0)).round() as u64
}

fn status_form(org_id: i64, current: &str) -> Markup {
    let options: String = OrgStatus::SETTABLE
        .into_iter()
        .map(|status| {
            format!(
                "<option value=\"{0}\"{1}>{0}</option>",
                status.as_str(),
                if status.as_str() == current { " selected" } else { "" }
            )
        })
        .collect();
    Markup::raw(format!(
        "<form class=\"status-form\" method=\"post\" action=\"/api/organizations/{org_id}/status\" data-method=\"PATCH\">\
         <select name=\"status\">{options}</select><button type=\"submit\">Update</button></form>"
    ))
}

/// Per-organization performance cards
#[must_use]
pub fn render_organization_stats(stats: &[OrganizationStat], query: &str) -> Markup {
    let mut html = components::page_header(
        "🏢",
        "Organization Performance",
        "Overview of all organizations' learning progress and risk assessment",
        None,
    );
    html.push(&components::search_bar(
        "/console/organization_stats",
        "Search organizations by name or status...",
        query,
    ));

    let matches = search::filter_org_stats(stats, query);
    if matches.is_empty() {
        html.push(&components::no_data(
            "🏢",
            if stats.is_empty() { "No organizations found" } else { "No Results Found" },
            None,
        ));
        return html;
    }

    html.push_raw("<div class=\"org-cont\">");
    for org in matches {
        let risk = &org.risk_distribution;
        html.push_raw(&format!(
            "<div class=\"org-stat-card\"><div class=\"org-card-header\"><div class=\"org-header-main\">\
             <h3>{name}</h3><span class=\"status-badge-mini {status}\">{status}</span></div>\
             <div class=\"org-header-meta\"><span class=\"created-date\">Created: {created}</span>\
             <div class=\"risk-indicator {risk_class}\">Risk: {risk_score}</div></div></div>\
             <div class=\"stats-metrics-grid\">\
             <div class=\"stat-item\"><span class=\"stat-value\">{employees}</span><span class=\"stat-label\">Total Employees</span></div>\
             <div class=\"stat-item\"><span class=\"stat-value\">{completed}</span><span class=\"stat-label\">Completed Courses</span></div>\
             <div class=\"stat-item\"><span class=\"stat-value\">{in_progress}</span><span class=\"stat-label\">In Progress</span></div>\
             <div class=\"stat-item\"><span class=\"stat-value\">{rate}%</span><span class=\"stat-label\">Complete</span></div></div>\
             <div class=\"risk-distribution\"><h4>Risk Distribution</h4>\
             <div class=\"risk-bar\"><span>High Risk</span><span class=\"bar-value\">{high}</span></div>\
             <div class=\"risk-bar\"><span>Medium Risk</span><span class=\"bar-value\">{medium}</span></div>\
             <div class=\"risk-bar\"><span>Low Risk</span><span class=\"bar-value\">{low}</span></div></div>\
             <div class=\"org-details\"><div class=\"progress-bar\"><div class=\"progress-fill\" style=\"width: {bar}%\"></div></div>\
             <p class=\"details-text\">{completed} out of {total} courses completed</p></div>",
            name = escape(&org.org_name),
            status = escape(&org.status),
            created = escape(&org.created_date),
            risk_class = risk_class(org.avg_risk_score),
            risk_score = one_decimal(org.avg_risk_score),
            employees = org.total_employees,
            completed = org.courses_completed,
            in_progress = org.in_progress_courses,
            rate = one_decimal(org.completion_rate),
            high = risk.high,
            medium = risk.medium,
            low = risk.low,
            bar = format_float(org.completion_rate.clamp(0.0, 100.0)),
            total = implied_course_total(org.courses_completed, org.completion_rate),
        ));
        html.push(&status_form(org.org_id, &org.status));
        html.push_raw("</div>");
    }
    html.push_raw("</div>");
    html
}

fn create_organization_form() -> Markup {
    let statuses: String = OrgStatus::SETTABLE
        .into_iter()
        .map(|status| format!("<option value=\"{0}\">{0}</option>", status.as_str()))
        .collect();
    Markup::raw(format!(
        "<details class=\"section create-org\"><summary>➕ Create Organization</summary>\
         <form method=\"post\" action=\"/api/organizations\">\
         <label>Organization Name <input type=\"text\" name=\"name\" placeholder=\"Enter organization name\" required></label>\
         <label>Portal Admin <input type=\"text\" name=\"portal_admin\" placeholder=\"Enter admin name\" required></label>\
         <label>Domain <input type=\"text\" name=\"org_domain\" placeholder=\"e.g. example.com\" required></label>\
         <label>Admin Email <input type=\"email\" name=\"admin_email\"></label>\
         <label>Status <select name=\"status\">{statuses}</select></label>\
         <label>Course IDs <input type=\"text\" name=\"course_ids\" placeholder=\"1, 2, 3\"></label>\
         <button type=\"submit\">Create</button></form></details>"
    ))
}

fn organization_row(org: &Organization) -> Vec<Markup> {
    let status = org.status.map_or("unknown", OrgStatus::as_str);
    let courses: Vec<&str> = org.courses.iter().map(|c| c.title.as_str()).collect();
    let actions = Markup::raw(format!(
        "{}<form method=\"post\" action=\"/api/organizations/{id}/courses\" class=\"assign-form\">\
         <input type=\"text\" name=\"course_ids\" placeholder=\"Course IDs\"><button type=\"submit\">Assign</button></form>\
         <form method=\"post\" action=\"/api/organizations/{id}/delete\" data-method=\"DELETE\" \
         data-confirm=\"Delete {name}? This cannot be undone.\"><button type=\"submit\" class=\"red\">Delete</button></form>",
        status_form(org.id, status),
        id = org.id,
        name = escape(&org.name),
    ));
    vec![
        Markup::text(&org.name),
        Markup::text(org.domain.as_deref().unwrap_or_default()),
        Markup::raw(format!("<span class=\"status-badge-mini {status}\">{status}</span>")),
        Markup::text(org.portal_admin.as_deref().unwrap_or_default()),
        Markup::text(org.created.as_deref().unwrap_or_default()),
        Markup::text(&courses.join(", ")),
        actions,
    ]
}

/// Organization management table with create, status, assign and delete
#[must_use]
pub fn render_organizations(orgs: &[Organization], query: &str) -> Markup {
    let mut html = components::page_header(
        "🏢",
        "Organization Management",
        "Create and manage organizations in your learning platform",
        None,
    );
    html.push(&create_organization_form());
    html.push(&components::search_bar(
        "/console/organization_list",
        "Search organizations by name, domain, or status...",
        query,
    ));

    let matches = search::filter_organizations(orgs, query);
    if matches.is_empty() {
        html.push(&components::no_data(
            "🏢",
            if orgs.is_empty() { "No organizations found" } else { "No Results Found" },
            None,
        ));
        return html;
    }

    let rows: Vec<Vec<Markup>> = matches.into_iter().map(organization_row).collect();
    html.push(&data_table(
        &["Name", "Domain", "Status", "Portal Admin", "Created", "Courses", "Actions"],
        &rows,
    ));
    html
}

fn user_grid<'a>(users: impl IntoIterator<Item = &'a UserAccount>, with_reset: bool) -> Markup {
    let mut html = Markup::raw("<div class=\"user-grid\">");
    for user in users {
        let reset = with_reset.then(|| {
            format!(
                "/api/portal-admins/{}/reset-password",
                urlencoding::encode(&user.username)
            )
        });
        html.push(&components::user_card(user, reset.as_deref()));
    }
    html.push_raw("</div>");
    html
}

/// Portal admin cards with password reset
#[must_use]
pub fn render_portal_admins(admins: &[UserAccount], query: &str) -> Markup {
    let mut html = components::page_header(
        "👨‍💼",
        "Portal Admins",
        "Manage and view all portal administrators in the system",
        Some(&Markup::raw(format!("<div class=\"count-pill\">{} total</div>", admins.len()))),
    );
    html.push(&components::search_bar(
        "/console/portal_admins",
        "🔍 Search portal admins by name, email, designation, or organization...",
        query,
    ));

    let matches = search::filter_portal_admins(admins, query);
    if matches.is_empty() {
        html.push(&components::no_data(
            "👨‍💼",
            if admins.is_empty() { "No Portal Admins Found" } else { "No Results Found" },
            None,
        ));
        return html;
    }
    html.push(&user_grid(matches, true));
    html
}

/// All accounts in the system
#[must_use]
pub fn render_users(users: &[UserAccount], query: &str) -> Markup {
    let mut html = components::page_header(
        "👥",
        "Total Users",
        "View and manage all users in the system",
        Some(&Markup::raw(format!("<div class=\"count-pill\">{} users</div>", users.len()))),
    );
    html.push(&components::search_bar(
        "/console/total_users",
        "🔍 Search users by name, email, role, designation, or organization...",
        query,
    ));

    let matches = search::filter_users(users, query);
    if matches.is_empty() {
        html.push(&components::no_data(
            "👥",
            if users.is_empty() { "No Users Found" } else { "No Results Found" },
            None,
        ));
        return html;
    }
    html.push(&user_grid(matches, false));
    html
}

fn request_actions(request: &CourseRequest) -> Markup {
    if request.status != RequestStatus::Pending {
        let reviewer = request
            .approved_by
            .as_deref()
            .map(|by| format!("by {by}"))
            .unwrap_or_default();
        return Markup::text(&reviewer);
    }
    let form = |action: &str, label: &str, class: &str| {
        format!(
            "<form method=\"post\" action=\"/api/course-requests/{id}/decision\">\
             <input type=\"hidden\" name=\"action\" value=\"{action}\">\
             <input type=\"text\" name=\"admin_notes\" placeholder=\"Notes\">\
             <button type=\"submit\" class=\"{class}\">{label}</button></form>",
            id = request.id
        )
    };
    Markup::raw(format!(
        "<div class=\"actions\">{}{}</div>",
        form("approve", "✔ Approve", "green"),
        form("reject", "✖ Reject", "red")
    ))
}

/// Purchase requests awaiting review
#[must_use]
pub fn render_course_requests(list: &CourseRequestList) -> Markup {
    let pending = list
        .requests
        .iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .count();
    let pills = Markup::raw(format!(
        "<div class=\"request-pills\"><div class=\"pill orange\">⏳ {pending} Pending</div>\
         <div class=\"pill gray\">📊 {} Total Requests</div></div>",
        list.requests.len()
    ));
    let mut html = components::page_header(
        "💳",
        "Course Purchase Requests",
        "Review and approve course purchase requests from organizations",
        Some(&pills),
    );

    if list.requests.is_empty() {
        html.push_raw("<div class=\"empty-requests\">📝 No course requests yet</div>");
        return html;
    }

    let rows: Vec<Vec<Markup>> = list
        .requests
        .iter()
        .map(|request| {
            vec![
                Markup::raw(format!(
                    "<div>🏢 {}</div><div>📚 {}</div>",
                    escape(&request.organization.name),
                    escape(&request.course.title)
                )),
                Markup::raw(format!(
                    "<div>{}</div><div class=\"muted\">{}</div>",
                    escape(&request.requester.username),
                    escape(request.requester.email.as_deref().unwrap_or_default())
                )),
                Markup::text(&format!(
                    "${}",
                    request.payment_amount.map_or_else(|| "0".to_string(), format_float)
                )),
                components::status_badge(request.status),
                Markup::text(request_date(request.requested_at.as_deref())),
                request_actions(request),
            ]
        })
        .collect();
    html.push(&data_table(
        &["Organization & Course", "Requester", "Amount", "Status", "Date", "Actions"],
        &rows,
    ));
    html
}

/// Date part of a `YYYY-MM-DD HH:MM:SS` or ISO timestamp
fn request_date(timestamp: Option<&str>) -> &str {
    let timestamp = timestamp.unwrap_or_default();
    timestamp
        .split([' ', 'T'])
        .next()
        .unwrap_or(timestamp)
}

/// Analytics dashboard: controls, tab strip and the active tab
#[must_use]
pub fn render_analytics(
    _ctx: &PageContext<'_>,
    tab: AnalyticsTab,
    report: Option<&Value>,
    loading: bool,
) -> Markup {
    let controls = Markup::raw(format!(
        "<div class=\"analytics-controls\">\
         <form method=\"post\" action=\"/api/panel/refresh\"><button type=\"submit\" class=\"refresh-btn\">🔄 Refresh</button></form>\
         <form method=\"post\" action=\"/api/analytics/export\"><input type=\"hidden\" name=\"type\" value=\"{tab}\">\
         <input type=\"hidden\" name=\"format\" value=\"csv\"><button type=\"submit\" class=\"export-btn\">📊 Export CSV</button></form>\
         <form method=\"post\" action=\"/api/analytics/export\"><input type=\"hidden\" name=\"type\" value=\"{tab}\">\
         <input type=\"hidden\" name=\"format\" value=\"excel\"><button type=\"submit\" class=\"export-btn\">📈 Export Excel</button></form></div>",
        tab = tab.as_str()
    ));
    let mut html = components::page_header("🏢", "Analytics Dashboard", "", Some(&controls));
    html.push(&analytics::render_tabs("/console/analytics", tab));
    html.push_raw("<div class=\"analytics-content\">");
    html.push(&analytics::render_tab(tab, report, loading));
    html.push_raw("</div>");
    html
}
