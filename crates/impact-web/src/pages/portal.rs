//! Portal admin pages, scoped to the admin's organization

use std::cmp::Ordering;

use impact_client::{ApiClient, ClientError, ClientResult, EmployeeRoster};
use impact_core::search;
use impact_core::types::{
    Course, CourseCatalog, EmployeeAtRisk, EmployeeProgress, OrganizationStatistics,
};
use serde_json::Value;

use super::{PageData, PageQuery, data_table};
use crate::cards::{CardSpec, render_card};
use crate::components::{self, StatTile};
use crate::render::{Markup, escape, field_number, field_text, format_float};
use crate::views::PortalPage;

/// Fetch the data of one portal admin page
///
/// # Errors
///
/// Returns the first failed backend call.
pub(super) async fn fetch(
    api: &ApiClient,
    username: &str,
    page: PortalPage,
    employee: Option<&str>,
) -> ClientResult<PageData> {
    let data = match page {
        PortalPage::Dashboard => PageData::PortalDashboard(api.organization_statistics(username).await?),
        PortalPage::Analytics => PageData::PortalAnalytics(api.organization_statistics(username).await?),
        PortalPage::Courses => PageData::Courses(api.course_catalog(username).await?),
        PortalPage::Employees => {
            let (roster, catalog) = tokio::try_join!(roster(api, username), api.course_catalog(username))?;
            PageData::Employees { roster, catalog }
        }
        PortalPage::Progress => {
            let roster = roster(api, username).await?;
            let selected = match employee {
                Some(name) => Some(api.employee_progress(name, username).await?),
                None => None,
            };
            PageData::Progress { roster, selected }
        }
        PortalPage::Settings => {
            return Err(ClientError::Invalid(impact_core::Error::NotFound {
                resource: format!("{} page data", page.slug()),
            }));
        }
    };
    Ok(data)
}

/// Employees of the admin's own organization
async fn roster(api: &ApiClient, username: &str) -> ClientResult<EmployeeRoster> {
    let org = api.org_domain(username).await?;
    api.organization_employees(org.organization_id).await
}

fn completion_card(title: &str, records: &[Value]) -> Markup {
    let spec = CardSpec::Progress {
        label: "title".to_string(),
        value: "enrolled_count".to_string(),
        value_text: "enrolled".to_string(),
        percent: "completion_rate".to_string(),
    };
    render_card(title, "", &spec, records)
}

fn risk_cards(employees: &[EmployeeAtRisk]) -> Markup {
    let mut html = Markup::raw("<div class=\"risk-grid\">");
    for employee in employees {
        html.push_raw(&format!(
            "<div class=\"risk-card\"><div class=\"risk-card-head\">{}<div><h4>{}</h4><p>{}</p></div></div><ul>",
            components::avatar(&employee.username),
            escape(&employee.username),
            escape(employee.email.as_deref().unwrap_or_default())
        ));
        for course in &employee.risk_courses {
            html.push_raw(&format!(
                "<li><span>{}</span><span class=\"risk-progress\">{}% progress</span>\
                 <span class=\"risk-score\">Risk {}</span></li>",
                escape(&course.title),
                format_float(course.progress),
                format_float(course.risk_score)
            ));
        }
        html.push_raw("</ul></div>");
    }
    html.push_raw("</div>");
    html
}

/// Headline tiles, completion rates and employees at risk
#[must_use]
pub fn render_dashboard(stats: &OrganizationStatistics) -> Markup {
    let headline = stats.headline();
    let tiles = [
        StatTile::new("⚠️ Employees at Risk", headline.employees_at_risk),
        StatTile::new(
            "✅ Overall Completion",
            format!("{}%", format_float((headline.completion_percent * 10.0).round() / 10.0)),
        ),
        StatTile::new("📚 Assigned Courses", headline.assigned_courses).linked("/console/courses"),
        StatTile::new("👥 Total Employees", headline.total_employees).linked("/console/employees"),
    ];

    let mut html = Markup::raw("<div class=\"portal-dashboard\">");
    html.push(&components::stat_grid(&tiles));
    html.push(&completion_card("Course Completion Rates", &stats.course_statistics));

    html.push_raw("<div class=\"section\"><h3>Employees at Risk</h3>");
    if stats.employees_at_risk.is_empty() {
        html.push(&components::no_data("🧑‍💼", "No Employee at risk", None));
    } else {
        html.push(&risk_cards(&stats.employees_at_risk));
    }
    html.push_raw("</div></div>");
    html
}

fn course_options(courses: &[Course]) -> String {
    courses
        .iter()
        .map(|course| format!("<option value=\"{}\">{}</option>", course.id, escape(&course.title)))
        .collect()
}

/// Employee roster with per-employee course assignment
#[must_use]
pub fn render_employees(roster: &EmployeeRoster, catalog: &CourseCatalog, query: &str) -> Markup {
    let mut html = components::page_header(
        "👥",
        "Employee Management",
        "Create and manage employees in your organization",
        Some(&Markup::raw(format!(
            "<div class=\"count-pill\">{} employees</div>",
            roster.employees.len()
        ))),
    );
    if roster.employees.is_empty() {
        html.push(&components::no_data(
            "📋",
            "No employees found",
            Some("Start by inviting or creating employees using the dashboard."),
        ));
        return html;
    }
    html.push(&components::search_bar("/console/employees", "Search employees...", query));

    let matches = search::filter_employees(&roster.employees, query);
    if matches.is_empty() {
        html.push(&components::no_data("👥", "No Results Found", None));
        return html;
    }

    let options = course_options(&catalog.assigned_courses);
    let rows: Vec<Vec<Markup>> = matches
        .into_iter()
        .map(|employee| {
            let assign = if options.is_empty() {
                Markup::text("No courses available")
            } else {
                Markup::raw(format!(
                    "<form method=\"post\" action=\"/api/course-assignments\" class=\"assign-form\">\
                     <input type=\"hidden\" name=\"employee_id\" value=\"{}\">\
                     <select name=\"course_id\">{options}</select><button type=\"submit\">Assign</button></form>",
                    employee.id
                ))
            };
            vec![
                Markup::raw(format!(
                    "<a href=\"/console/progress?employee={}\">{}</a>",
                    urlencoding::encode(&employee.name),
                    escape(&employee.name)
                )),
                Markup::text(employee.email.as_deref().unwrap_or_default()),
                Markup::text(employee.designation.as_deref().unwrap_or("N/A")),
                assign,
            ]
        })
        .collect();
    html.push(&data_table(&["Employee", "Email", "Designation", "Assign Course"], &rows));
    html
}

fn course_card(course: &Course) -> Markup {
    let action = if course.is_assigned {
        format!(
            "<form method=\"post\" action=\"/api/course-assignments\" \
             data-confirm=\"Assign {} to every employee?\">\
             <input type=\"hidden\" name=\"course_id\" value=\"{}\">\
             <button type=\"submit\">Assign to all employees</button></form>",
            escape(&course.title),
            course.id
        )
    } else if course.is_pending_request {
        "<span class=\"pending-badge\">⏳ Request pending</span>".to_string()
    } else {
        "<span class=\"muted\">Not purchased</span>".to_string()
    };
    let price = course
        .price
        .map(|price| format!("<span class=\"price\">${}</span>", format_float(price)))
        .unwrap_or_default();
    Markup::raw(format!(
        "<div class=\"course-card{}\"><h3>{}</h3><p>{}</p><div class=\"course-meta\"><span>{} modules</span>{price}</div>{action}</div>",
        if course.is_assigned { " assigned" } else { "" },
        escape(&course.title),
        escape(course.description.as_deref().unwrap_or_default()),
        course.module_count
    ))
}

fn course_cards(courses: &[Course], query: &str) -> Vec<Markup> {
    search::filter_by(courses, query, |c| [Some(c.title.as_str()), c.description.as_deref()])
        .into_iter()
        .map(course_card)
        .collect()
}

/// Course catalog split into assigned and available courses
#[must_use]
pub fn render_courses(catalog: &CourseCatalog, query: &str) -> Markup {
    let mut html = components::page_header(
        "📚",
        "Courses",
        "Courses available to your organization",
        None,
    );
    html.push(&components::search_bar("/console/courses", "Search courses...", query));

    let assigned = course_cards(&catalog.assigned_courses, query);
    let others: Vec<Course> = catalog
        .all_courses
        .iter()
        .filter(|course| !catalog.assigned_courses.iter().any(|a| a.id == course.id))
        .cloned()
        .collect();
    let available = course_cards(&others, query);

    if assigned.is_empty() && available.is_empty() {
        html.push(&components::no_data("📚", "No courses found", None));
        return html;
    }
    for (title, cards) in [("Assigned Courses", assigned), ("Available Courses", available)] {
        if cards.is_empty() {
            continue;
        }
        html.push_raw(&format!("<div class=\"section\"><h3>{title}</h3><div class=\"course-grid\">"));
        for card in &cards {
            html.push(card);
        }
        html.push_raw("</div></div>");
    }
    html
}

fn progress_detail(roster: &EmployeeRoster, progress: &EmployeeProgress) -> Markup {
    let profile = &progress.employee;
    let employee_id = roster
        .employees
        .iter()
        .find(|e| e.name == profile.username)
        .map(|e| e.id);

    let mut html = Markup::raw(format!(
        "<div class=\"progress-detail\"><div class=\"profile\">{}<div><h3>{}</h3><p>{}</p><p class=\"muted\">{}</p></div></div>",
        components::avatar(&profile.username),
        escape(&profile.username),
        escape(profile.email.as_deref().unwrap_or_default()),
        escape(profile.designation.as_deref().unwrap_or_default())
    ));
    html.push(&components::stat_grid(&[
        StatTile::new("Average Progress", format!("{}%", format_float(progress.average_progress))),
        StatTile::new("Total Courses", progress.total_courses),
        StatTile::new("Completed", progress.completed_courses),
    ]));

    html.push_raw("<div class=\"section\"><h3>Course Progress</h3>");
    if progress.courses.is_empty() {
        html.push_raw("<p class=\"muted\">No courses assigned yet</p>");
    }
    for course in &progress.courses {
        let unassign = employee_id
            .map(|id| {
                format!(
                    "<form method=\"post\" action=\"/api/course-assignments/remove\" \
                     data-confirm=\"Remove {title} from {name}?\">\
                     <input type=\"hidden\" name=\"course_id\" value=\"{course}\">\
                     <input type=\"hidden\" name=\"employee_id\" value=\"{id}\">\
                     <button type=\"submit\" class=\"red\">Unassign</button></form>",
                    title = escape(&course.course_title),
                    name = escape(&profile.username),
                    course = course.course_id,
                )
            })
            .unwrap_or_default();
        html.push_raw(&format!(
            "<div class=\"course-progress{}\"><div class=\"course-progress-head\"><h4>{}</h4><span>{}%</span></div>\
             <div class=\"progress-bar\"><div class=\"progress-fill\" style=\"width: {}%\"></div></div>\
             <div class=\"course-progress-meta\"><span>{}/{} modules</span><span>Quiz {}</span><span>{}</span></div>{unassign}</div>",
            if course.completed { " completed" } else { "" },
            escape(&course.course_title),
            format_float(course.progress_percentage),
            format_float(course.progress_percentage.clamp(0.0, 100.0)),
            course.completed_modules,
            course.total_modules,
            format_float(course.quiz_score),
            escape(course.last_accessed.as_deref().unwrap_or("Never accessed"))
        ));
    }
    html.push_raw("</div></div>");
    html
}

/// Employee list with the selected employee's course progress
#[must_use]
pub fn render_progress(roster: &EmployeeRoster, selected: Option<&EmployeeProgress>, query: &PageQuery) -> Markup {
    let mut html = components::page_header(
        "📈",
        "Employee Progress",
        "Track course progress of the employees in your organization",
        None,
    );
    html.push_raw("<div class=\"progress-layout\"><div class=\"employee-list\">");
    html.push(&components::search_bar("/console/progress", "Search employees...", query.search()));

    let matches = search::filter_employees(&roster.employees, query.search());
    if matches.is_empty() {
        html.push(&components::no_data("👥", "No employees found", None));
    }
    let current = query.employee.as_deref().map(str::trim);
    for employee in matches {
        html.push_raw(&format!(
            "<a class=\"employee-item{}\" href=\"/console/progress?employee={}\">{}<span>{}</span></a>",
            if current == Some(employee.name.as_str()) { " selected" } else { "" },
            urlencoding::encode(&employee.name),
            components::avatar(&employee.name),
            escape(&employee.name)
        ));
    }
    html.push_raw("</div>");

    match selected {
        Some(progress) => html.push(&progress_detail(roster, progress)),
        None => html.push(&components::no_data(
            "👈",
            "Select an employee",
            Some("Choose an employee to see their course progress."),
        )),
    }
    html.push_raw("</div>");
    html
}

/// Tabs of the portal analytics page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PortalAnalyticsTab {
    /// Completion rates and top performers
    #[default]
    Overview,
    /// Per-course table
    Courses,
    /// Per-employee table
    Employees,
    /// Employees at risk
    Risk,
}

impl PortalAnalyticsTab {
    /// Tabs in display order
    pub const ALL: [Self; 4] = [Self::Overview, Self::Courses, Self::Employees, Self::Risk];

    /// Tab named in the query; unknown names fall back to the overview
    #[must_use]
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("courses") => Self::Courses,
            Some("employees") => Self::Employees,
            Some("risk") => Self::Risk,
            _ => Self::Overview,
        }
    }

    /// Query value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Courses => "courses",
            Self::Employees => "employees",
            Self::Risk => "risk",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Courses => "Course Analytics",
            Self::Employees => "Employee Progress",
            Self::Risk => "Risk Assessment",
        }
    }
}

/// Employees with at least one course, best average progress first
fn top_performers(records: &[Value]) -> Vec<Value> {
    let mut top: Vec<Value> = records
        .iter()
        .filter(|r| field_number(r, "assigned_count").is_some_and(|n| n > 0.0))
        .cloned()
        .collect();
    top.sort_by(|a, b| {
        let a = field_number(a, "avg_progress").unwrap_or_default();
        let b = field_number(b, "avg_progress").unwrap_or_default();
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
    top
}

fn percent_cell(record: &Value, field: &str) -> Markup {
    Markup::text(&format!("{}%", format_float(field_number(record, field).unwrap_or_default())))
}

fn course_table(records: &[Value]) -> Markup {
    if records.is_empty() {
        return components::no_data("📚", "No course data available", None);
    }
    let rows: Vec<Vec<Markup>> = records
        .iter()
        .map(|r| {
            vec![
                Markup::text(&field_text(r, "title")),
                Markup::text(&field_text(r, "enrolled_count")),
                Markup::text(&field_text(r, "completed_count")),
                percent_cell(r, "completion_rate"),
                percent_cell(r, "avg_progress"),
                Markup::text(&field_text(r, "at_risk_count")),
            ]
        })
        .collect();
    data_table(
        &["Course Name", "Enrolled", "Completed", "Completion Rate", "Avg Progress", "At Risk"],
        &rows,
    )
}

fn employee_table(records: &[Value]) -> Markup {
    if records.is_empty() {
        return components::no_data("👥", "No employee data available", None);
    }
    let rows: Vec<Vec<Markup>> = records
        .iter()
        .map(|r| {
            let designation = field_text(r, "designation");
            vec![
                Markup::text(&field_text(r, "username")),
                Markup::text(if designation.is_empty() { "N/A" } else { &designation }),
                Markup::text(&field_text(r, "assigned_count")),
                Markup::text(&field_text(r, "completed_count")),
                percent_cell(r, "avg_progress"),
                Markup::text(&field_text(r, "high_risk_count")),
            ]
        })
        .collect();
    data_table(
        &["Employee", "Designation", "Assigned", "Completed", "Avg Progress", "High Risk"],
        &rows,
    )
}

/// Organization analytics with overview, course, employee and risk tabs
#[must_use]
pub fn render_analytics(stats: &OrganizationStatistics, query: &PageQuery) -> Markup {
    let tab = PortalAnalyticsTab::parse(query.tab.as_deref());
    let headline = stats.headline();
    let average_progress = stats.data.as_ref().map_or(headline.completion_percent, |d| d.avg_progress);

    let mut html = components::page_header(
        "📊",
        "Analytics Dashboard",
        "Real-time insights into your organization's learning progress",
        None,
    );
    html.push(&components::stat_grid(&[
        StatTile::new("Total Employees", headline.total_employees),
        StatTile::new("Total Courses", headline.assigned_courses),
        StatTile::new("Avg Progress", format!("{}%", format_float((average_progress * 10.0).round() / 10.0))),
        StatTile::new("Employees at Risk", headline.employees_at_risk),
    ]));

    let links: String = PortalAnalyticsTab::ALL
        .into_iter()
        .map(|t| {
            format!(
                "<a class=\"tab{}\" href=\"/console/analytics?tab={}\">{}</a>",
                if t == tab { " active" } else { "" },
                t.as_str(),
                t.label()
            )
        })
        .collect();
    html.push_raw(&format!("<nav class=\"analytics-tabs\">{links}</nav><div class=\"analytics-content\">"));

    match tab {
        PortalAnalyticsTab::Overview => {
            html.push(&completion_card("Course Completion Rates", &stats.course_statistics));
            let spec = CardSpec::Progress {
                label: "username".to_string(),
                value: "completed_count".to_string(),
                value_text: "completed".to_string(),
                percent: "avg_progress".to_string(),
            };
            html.push(&render_card(
                "Top Performing Employees",
                "",
                &spec,
                &top_performers(&stats.employee_statistics),
            ));
        }
        PortalAnalyticsTab::Courses => {
            html.push_raw("<div class=\"section\"><h3>Course Performance Analysis</h3>");
            html.push(&course_table(&stats.course_statistics));
            html.push_raw("</div>");
        }
        PortalAnalyticsTab::Employees => {
            html.push_raw("<div class=\"section\"><h3>Employee Progress Summary</h3>");
            html.push(&employee_table(&stats.employee_statistics));
            html.push_raw("</div>");
        }
        PortalAnalyticsTab::Risk => {
            if stats.employees_at_risk.is_empty() {
                html.push_raw("<div class=\"section no-risk\">🎉 Great news! No employees are currently at risk.</div>");
            } else {
                html.push(&risk_cards(&stats.employees_at_risk));
            }
        }
    }
    html.push_raw("</div>");
    html
}
