//! Analytics dashboard composition
//!
//! Each report tab is a list of [`Section`]s over the tab's payload. A
//! section picks one array out of the payload and hands it to the card
//! dispatcher or the chart placeholder. Sections whose array is absent are
//! skipped, the way the old dashboard only mounted cards for data it had.

use std::collections::HashMap;

use impact_core::types::AnalyticsKind;
use serde_json::Value;

use crate::cards::{CardSpec, LegacyCardParams, render_card};
use crate::components::{self, ChartKind, StatTile};
use crate::render::{Markup, display_value, escape};

/// Tabs of the analytics dashboard are the backend report kinds
pub type AnalyticsTab = AnalyticsKind;

/// Tab caption
#[must_use]
pub const fn tab_label(tab: AnalyticsTab) -> &'static str {
    match tab {
        AnalyticsKind::Overview => "Overview",
        AnalyticsKind::Users => "User Analytics",
        AnalyticsKind::Courses => "Course Analytics",
        AnalyticsKind::Organizations => "Organizations",
        AnalyticsKind::Learning => "Learning Analytics",
        AnalyticsKind::System => "System Analytics",
        AnalyticsKind::Financial => "Financial",
        AnalyticsKind::Compliance => "Compliance",
    }
}

/// Payload key a tab needs before any of its sections are shown
const fn gate_key(tab: AnalyticsTab) -> Option<&'static str> {
    match tab {
        AnalyticsKind::Users => Some("registration_trends"),
        AnalyticsKind::Courses => Some("popular_courses"),
        AnalyticsKind::Organizations => Some("organization_sizes"),
        AnalyticsKind::System => Some("page_views"),
        AnalyticsKind::Overview
        | AnalyticsKind::Learning
        | AnalyticsKind::Financial
        | AnalyticsKind::Compliance => None,
    }
}

const fn subject(tab: AnalyticsTab) -> &'static str {
    match tab {
        AnalyticsKind::Users => "user",
        AnalyticsKind::Courses => "course",
        AnalyticsKind::Organizations => "organizations",
        AnalyticsKind::System => "system",
        AnalyticsKind::Learning => "learning",
        AnalyticsKind::Overview | AnalyticsKind::Financial | AnalyticsKind::Compliance => "",
    }
}

/// Headline tiles and recent activity of the overview tab
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewSummary {
    pub tiles: Vec<StatTile>,
    pub recent_activity: Vec<Value>,
}

fn counter(payload: &Value, group: &str, key: &str) -> String {
    let shown = display_value(payload.get(group).and_then(|g| g.get(key)));
    if shown.is_empty() { "0".to_string() } else { shown }
}

impl OverviewSummary {
    /// Aggregate the overview report; missing counters read as 0
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let tiles = vec![
            StatTile::new("Total Users", counter(payload, "users", "total"))
                .with_sub(format!("Active (7d): {}", counter(payload, "users", "active_7d"))),
            StatTile::new("Organizations", counter(payload, "organizations", "total")),
            StatTile::new("Courses", counter(payload, "courses", "total")).with_sub(format!(
                "Completion Rate: {}%",
                counter(payload, "courses", "completion_rate")
            )),
            StatTile::new(
                "Quiz Performance",
                format!("{}%", counter(payload, "quizzes", "average_score")),
            )
            .with_sub(format!(
                "Total Attempts: {}",
                counter(payload, "quizzes", "total_attempts")
            )),
        ];

        let activity = |label: &str, group: &str, key: &str| {
            serde_json::json!({ "label": label, "value": counter(payload, group, key) })
        };
        let recent_activity = vec![
            activity("Recent Logins (24h)", "users", "recent_logins_24h"),
            activity("Course Enrollments", "courses", "enrollments"),
            activity("Completed Courses", "courses", "completed"),
        ];

        Self {
            tiles,
            recent_activity,
        }
    }

    /// Metrics grid plus the recent activity card
    #[must_use]
    pub fn render(&self) -> Markup {
        let mut html = Markup::raw("<div class=\"analytics-overview\">");
        html.push(&components::stat_grid(&self.tiles));
        if let Some(spec) = CardSpec::from_legacy(1, &LegacyCardParams::fields("label", "value")) {
            html.push(&render_card("Recent Activity", "", &spec, &self.recent_activity));
        }
        html.push_raw("</div>");
        html
    }
}

/// What a section draws
#[derive(Debug, Clone, PartialEq)]
pub enum SectionKind {
    Card { spec: CardSpec, class: &'static str },
    Chart { kind: ChartKind, x: &'static str, y: &'static str },
}

/// One card or chart over an array in the payload
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub title: &'static str,
    /// Payload key the records come from
    pub source: &'static str,
    pub kind: SectionKind,
    pub records: &'a [Value],
}

impl Section<'_> {
    /// Render the card or chart
    #[must_use]
    pub fn render(&self) -> Markup {
        match &self.kind {
            SectionKind::Card { spec, class } => render_card(self.title, class, spec, self.records),
            SectionKind::Chart { kind, x, y } => {
                components::chart_placeholder(*kind, self.title, self.records, x, y)
            }
        }
    }
}

struct Blueprint {
    title: &'static str,
    source: &'static str,
    kind: SectionKind,
    /// Charts are drawn even when their array is missing
    always: bool,
}

fn card(title: &'static str, source: &'static str, tag: u8, class: &'static str, params: &LegacyCardParams) -> Option<Blueprint> {
    CardSpec::from_legacy(tag, params).map(|spec| Blueprint {
        title,
        source,
        kind: SectionKind::Card { spec, class },
        always: false,
    })
}

const fn chart(title: &'static str, source: &'static str, kind: ChartKind, x: &'static str, y: &'static str) -> Option<Blueprint> {
    Some(Blueprint {
        title,
        source,
        kind: SectionKind::Chart { kind, x, y },
        always: true,
    })
}

fn blueprints(tab: AnalyticsTab) -> Vec<Blueprint> {
    let fields = LegacyCardParams::fields;
    let plans = match tab {
        AnalyticsKind::Users => vec![
            card("User Registration Trends", "registration_trends", 8, "", &fields("date", "count").type_text("registrations")),
            card("User Roles Distribution", "role_distribution", 8, "green", &fields("role", "count")),
            card("Top Active Users", "top_active_users", 10, "purple", &fields("username", "session_count")),
            card(
                "Login Patterns by Hour",
                "login_patterns",
                8,
                "yellow",
                &fields("hour", "count").value_text(":00").type_text("logins"),
            ),
        ],
        AnalyticsKind::Courses => vec![
            card("Popular Courses", "popular_courses", 6, "", &fields("course_title", "enrollment_count").type_text("enrollments")),
            card(
                "Course Completion Rates",
                "completion_rates",
                7,
                "",
                &LegacyCardParams {
                    key_value: Some("course_title".into()),
                    ..LegacyCardParams::default()
                }
                .type_text("Enrolled: ")
                .type_value("total_enrollments")
                .second_text("Completed: ")
                .second_value("completed_count")
                .tag("completion_rate", "%"),
            ),
            card("Average Time Spent", "time_spent", 6, "", &fields("course_title", "avg_time_minutes").type_text("minutes")),
        ],
        AnalyticsKind::Organizations => vec![
            card("Organization Sizes", "organization_sizes", 8, "", &fields("organization", "employee_count").type_text("employees")),
            card(
                "Course Assignments by Organization",
                "organization_sizes",
                8,
                "",
                &fields("organization", "course_count").type_text(" courses assigned"),
            ),
        ],
        AnalyticsKind::Learning => vec![
            card(
                "📊 Quiz Performance Trends",
                "quiz_trends",
                2,
                "",
                &fields("date", "avg_score").type_value("attempt_count").type_text("attempts"),
            ),
            card("📝 Content Interactions", "content_interactions", 3, "", &fields("type", "count")),
            card("🏅 Top Learners", "top_learners", 1, "", &fields("username", "avg_progress").type_text("% avg progress")),
        ],
        AnalyticsKind::System => vec![
            chart("📈 Page Views (Last 7 Days)", "page_views", ChartKind::Line, "date", "views"),
            card("Most Visited Pages", "popular_pages", 3, "", &fields("page", "visits").value_text("visits")),
            card(
                "API Usage Statistics",
                "api_usage",
                5,
                "",
                &fields("endpoint", "request_count")
                    .value_text("requests")
                    .type_value("avg_response_time")
                    .type_text("ms avg"),
            ),
            card("System Metrics", "system_metrics", 4, "", &fields("name", "value").value_text("unit")),
            chart("📈 API Requests by Endpoint", "api_usage", ChartKind::Bar, "endpoint", "request_count"),
            chart("⚙️ System Metrics", "system_metrics", ChartKind::Pie, "name", "value"),
        ],
        AnalyticsKind::Overview | AnalyticsKind::Financial | AnalyticsKind::Compliance => Vec::new(),
    };
    plans.into_iter().flatten().collect()
}

/// The block a tab reads its arrays from
///
/// Learning reports arrive either on their own or nested under `learning`
/// inside the overview report.
fn tab_block(tab: AnalyticsTab, payload: &Value) -> &Value {
    match tab {
        AnalyticsKind::Learning => payload
            .get("learning")
            .filter(|block| block.is_object())
            .unwrap_or(payload),
        _ => payload,
    }
}

/// Sections a tab shows for `payload`
#[must_use]
pub fn sections_for(tab: AnalyticsTab, payload: &Value) -> Vec<Section<'_>> {
    let block = tab_block(tab, payload);
    blueprints(tab)
        .into_iter()
        .filter_map(|plan| {
            let records = block.get(plan.source).and_then(Value::as_array);
            let records: &[Value] = match (records, plan.always) {
                (Some(records), _) => records,
                (None, true) => &[],
                (None, false) => return None,
            };
            Some(Section {
                title: plan.title,
                source: plan.source,
                kind: plan.kind,
                records,
            })
        })
        .collect()
}

/// Content area of one tab
///
/// `payload` is `None` until the first fetch for the tab has finished.
#[must_use]
pub fn render_tab(tab: AnalyticsTab, payload: Option<&Value>, loading: bool) -> Markup {
    match tab {
        AnalyticsKind::Financial => {
            return coming_soon("Financial Analytics", "Financial analytics features coming soon...");
        }
        AnalyticsKind::Compliance => {
            return coming_soon(
                "Compliance Analytics",
                "Certification and compliance tracking features coming soon...",
            );
        }
        _ => {}
    }

    let Some(payload) = payload else {
        return components::loading(&format!("Loading {} analytics...", subject(tab)));
    };

    if tab == AnalyticsKind::Overview {
        return OverviewSummary::from_payload(payload).render();
    }

    if let Some(key) = gate_key(tab)
        && payload.get(key).is_none()
    {
        let text = if loading {
            format!("Loading {} analytics...", subject(tab))
        } else {
            format!("No {} analytics data available yet", subject(tab))
        };
        return Markup::raw(format!("<div class=\"text-center\">{}</div>", escape(&text)));
    }

    let mut html = Markup::raw(format!("<div class=\"analytics-{}\">", tab.as_str()));
    for section in sections_for(tab, payload) {
        html.push(&section.render());
    }
    html.push_raw("</div>");
    html
}

fn coming_soon(title: &str, text: &str) -> Markup {
    Markup::raw(format!(
        "<div class=\"coming-soon\"><h3>{}</h3><p>{}</p></div>",
        escape(title),
        escape(text)
    ))
}

/// Tab strip linking each report
#[must_use]
pub fn render_tabs(base: &str, active: AnalyticsTab) -> Markup {
    let links: String = AnalyticsKind::ALL
        .into_iter()
        .map(|tab| {
            format!(
                "<a class=\"analytics-tab{}\" href=\"{}?tab={}\">{}</a>",
                if tab == active { " active" } else { "" },
                escape(base),
                tab.as_str(),
                tab_label(tab)
            )
        })
        .collect();
    Markup::raw(format!("<div class=\"analytics-tabs\">{links}</div>"))
}

/// Reports already fetched in this view session
///
/// Tabs are fetched on first activation and kept so switching back shows the
/// last report while the active tab refreshes.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsCache {
    reports: HashMap<AnalyticsTab, Value>,
}

impl AnalyticsCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last report for a tab
    #[must_use]
    pub fn get(&self, tab: AnalyticsTab) -> Option<&Value> {
        self.reports.get(&tab)
    }

    /// Replace the report for a tab
    pub fn store(&mut self, tab: AnalyticsTab, report: Value) {
        self.reports.insert(tab, report);
    }

    /// Whether the tab has been fetched
    #[must_use]
    pub fn contains(&self, tab: AnalyticsTab) -> bool {
        self.reports.contains_key(&tab)
    }

    /// Number of cached tabs
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether nothing has been fetched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_overview_defaults_missing_counters() {
        let summary = OverviewSummary::from_payload(&json!({}));
        let values: Vec<_> = summary.tiles.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["0", "0", "0", "0%"]);
        assert_eq!(summary.tiles[0].sub.as_deref(), Some("Active (7d): 0"));
        assert_eq!(summary.tiles[2].sub.as_deref(), Some("Completion Rate: 0%"));
        assert_eq!(summary.recent_activity[0]["value"], "0");
    }

    #[test]
    fn test_overview_reads_groups() {
        let summary = OverviewSummary::from_payload(&json!({
            "users": {"total": 120, "active_7d": 40, "recent_logins_24h": 9},
            "organizations": {"total": 4},
            "courses": {"total": 12, "completion_rate": 62.5, "enrollments": 300, "completed": 80},
            "quizzes": {"average_score": 71, "total_attempts": 500}
        }));
        assert_eq!(summary.tiles[0].value, "120");
        assert_eq!(summary.tiles[2].sub.as_deref(), Some("Completion Rate: 62.5%"));
        assert_eq!(summary.tiles[3].value, "71%");
        assert_eq!(summary.recent_activity[2]["value"], "80");
        assert_eq!(summary.recent_activity[0]["label"], "Recent Logins (24h)");
    }

    #[test]
    fn test_users_sections_skip_missing_arrays() {
        let payload = json!({
            "registration_trends": [{"date": "2024-05-01", "count": 3}],
            "top_active_users": []
        });
        let titles: Vec<_> = sections_for(AnalyticsKind::Users, &payload)
            .iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["User Registration Trends", "Top Active Users"]);
    }

    #[test]
    fn test_system_charts_always_present() {
        let data = json!({});
        let sections = sections_for(AnalyticsKind::System, &data);
        assert_eq!(sections.len(), 3);
        assert!(sections.iter().all(|s| matches!(s.kind, SectionKind::Chart { .. })));
        assert!(sections[0].render().as_str().contains("No data available"));
    }

    #[test]
    fn test_learning_reads_nested_block() {
        let payload = json!({"learning": {"top_learners": [{"username": "ann", "avg_progress": 88}]}});
        let sections = sections_for(AnalyticsKind::Learning, &payload);
        assert_eq!(sections.len(), 1);
        let html = sections[0].render();
        assert!(html.as_str().contains("ann"));
        assert!(html.as_str().contains("% avg progress"));
    }

    #[test]
    fn test_gate_message() {
        let html = render_tab(AnalyticsKind::Users, Some(&json!({})), false);
        assert!(html.as_str().contains("No user analytics data available yet"));
        let html = render_tab(AnalyticsKind::Courses, Some(&json!({})), true);
        assert!(html.as_str().contains("Loading course analytics..."));
    }

    #[test]
    fn test_financial_and_compliance_coming_soon() {
        assert!(render_tab(AnalyticsKind::Financial, None, false).as_str().contains("coming soon"));
        assert!(render_tab(AnalyticsKind::Compliance, None, false).as_str().contains("Compliance Analytics"));
    }

    #[test]
    fn test_cache() {
        let mut cache = AnalyticsCache::new();
        assert!(cache.is_empty());
        cache.store(AnalyticsKind::Users, json!({"a": 1}));
        cache.store(AnalyticsKind::Users, json!({"a": 2}));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(AnalyticsKind::Users), Some(&json!({"a": 2})));
        assert!(!cache.contains(AnalyticsKind::System));
    }

    #[test]
    fn test_tabs_mark_active() {
        let html = render_tabs("/console/analytics", AnalyticsKind::System);
        assert!(html.as_str().contains("analytics-tab active\" href=\"/console/analytics?tab=system\""));
    }
}
