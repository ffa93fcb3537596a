//! Presentational building blocks shared by every page
//!
//! Each function is a pure render over its arguments. Nothing here fetches
//! data or reads application state.

use impact_core::types::{RequestStatus, UserAccount};
use serde_json::Value;

use crate::render::{Markup, escape};

/// One sidebar entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLink {
    pub href: String,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub active: bool,
}

/// Navigation sidebar
///
/// A collapsed sidebar keeps the icons and drops the heading and labels.
#[must_use]
pub fn sidebar(title: &str, subtitle: &str, links: &[MenuLink], collapsed: bool, toggle_href: &str) -> Markup {
    let mut html = Markup::raw(format!(
        "<nav class=\"sidebar-nav{}\"><div class=\"sidebar-header\">",
        if collapsed { " collapsed" } else { "" }
    ));
    if !collapsed {
        html.push_raw(&format!(
            "<div><h2>{}</h2><p>{}</p></div>",
            escape(title),
            escape(subtitle)
        ));
    }
    html.push_raw(&format!(
        "<a class=\"sidebar-toggle\" href=\"{}\" title=\"Toggle sidebar\">{}</a></div><div class=\"sidebar-menu\">",
        escape(toggle_href),
        if collapsed { "☰" } else { "✕" }
    ));

    for link in links {
        let label = if collapsed {
            String::new()
        } else {
            format!("<span>{}</span>", escape(link.label))
        };
        html.push_raw(&format!(
            "<a class=\"menu-item{}\" href=\"{}\" style=\"--accent: {}\"><span class=\"menu-icon\">{}</span>{label}</a>",
            if link.active { " active" } else { "" },
            escape(&link.href),
            link.color,
            link.icon,
        ));
    }

    html.push_raw(&format!(
        "</div><form class=\"sign-out\" method=\"post\" action=\"/api/session/sign-out\" data-confirm=\"Are you sure you want to sign out? You will need to log in again to access your account.\">\
         <button type=\"submit\">⎋{}</button></form></nav>",
        if collapsed { "" } else { "<span>Sign Out</span>" }
    ));
    html
}

/// Inputs of the top bar
#[derive(Debug, Clone, Default)]
pub struct HeaderProps<'a> {
    pub title: &'a str,
    pub username: &'a str,
    pub loading: bool,
    pub refresh_href: Option<&'a str>,
    pub auto_refresh: Option<&'a str>,
    pub unread_notifications: Option<u64>,
    pub compact: bool,
    pub right: Option<Markup>,
}

/// Top bar with the page title, live badge, refresh control and avatar
#[must_use]
pub fn dashboard_header(props: &HeaderProps<'_>) -> Markup {
    let badge = if props.loading {
        "<div class=\"status-badge updating\">⟳ UPDATING</div>"
    } else {
        "<div class=\"status-badge live\"><span class=\"pulse\"></span>LIVE</div>"
    };

    let mut html = Markup::raw(format!(
        "<header class=\"dashboard-header\"><div class=\"header-left\"><div class=\"logo\">{}</div>{badge}</div><div class=\"header-right\">",
        escape(props.title)
    ));

    if !props.compact {
        html.push_raw(&format!(
            "<div class=\"user-welcome\"><span>Welcome back,</span> <strong>{}</strong></div>",
            escape(props.username)
        ));
    }
    if let Some(right) = &props.right {
        html.push(right);
    }
    html.push(&notification_bell(props.unread_notifications));
    if let Some(href) = props.refresh_href {
        html.push_raw(&format!(
            "<form method=\"post\" action=\"{}\" class=\"refresh\"><button type=\"submit\" title=\"Refresh\"{}>⟳</button></form>",
            escape(href),
            if props.loading { " disabled" } else { "" }
        ));
    }
    if let (Some(interval), false) = (props.auto_refresh, props.compact) {
        html.push_raw(&format!(
            "<div class=\"auto-refresh\"><div>Auto-refresh</div><div class=\"interval\">{}</div></div>",
            escape(interval)
        ));
    }
    html.push(&avatar(props.username));
    html.push_raw("</div></header>");
    html
}

/// Unread notification count; nothing when the count is unknown
#[must_use]
pub fn notification_bell(unread: Option<u64>) -> Markup {
    match unread {
        None => Markup::new(),
        Some(0) => Markup::raw("<span class=\"notification-bell\">🔔</span>"),
        Some(count) => Markup::raw(format!(
            "<span class=\"notification-bell\">🔔<span class=\"notification-count\">{}</span></span>",
            if count > 99 { "99+".to_string() } else { count.to_string() }
        )),
    }
}

/// First letter of the username, `A` when blank
#[must_use]
pub fn avatar(username: &str) -> Markup {
    let initial = username
        .chars()
        .next()
        .map_or_else(|| "A".to_string(), |c| c.to_uppercase().collect());
    Markup::raw(format!("<div class=\"avatar\">{}</div>", escape(&initial)))
}

/// Page title block with an optional trailing fragment
#[must_use]
pub fn page_header(icon: &str, title: &str, subtitle: &str, extra: Option<&Markup>) -> Markup {
    let mut html = Markup::raw(format!(
        "<div class=\"page-header\"><div class=\"page-header-main\"><span class=\"page-icon\">{}</span><div><h1>{}</h1>",
        escape(icon),
        escape(title)
    ));
    if !subtitle.trim().is_empty() {
        html.push_raw(&format!("<p>{}</p>", escape(subtitle.trim())));
    }
    html.push_raw("</div></div>");
    if let Some(extra) = extra {
        html.push(extra);
    }
    html.push_raw("</div>");
    html
}

/// One tile of a metrics grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatTile {
    pub title: String,
    pub value: String,
    pub sub: Option<String>,
    pub href: Option<String>,
}

impl StatTile {
    /// Tile without a sub line or link
    pub fn new(title: impl Into<String>, value: impl ToString) -> Self {
        Self {
            title: title.into(),
            value: value.to_string(),
            sub: None,
            href: None,
        }
    }

    /// Add a sub line
    #[must_use]
    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Make the tile a link
    #[must_use]
    pub fn linked(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}

/// Grid of headline numbers
#[must_use]
pub fn stat_grid(tiles: &[StatTile]) -> Markup {
    if tiles.is_empty() {
        return Markup::raw("<div class=\"text\">No metrics available</div>");
    }

    let cards: String = tiles
        .iter()
        .map(|tile| {
            let sub = tile
                .sub
                .as_ref()
                .map(|sub| format!("<div class=\"metric-sub\">{}</div>", escape(sub)))
                .unwrap_or_default();
            let body = format!(
                "<h3>{}</h3><div class=\"metric-value\">{}</div>{sub}",
                escape(&tile.title),
                escape(&tile.value)
            );
            match &tile.href {
                Some(href) => format!("<a class=\"metric-card\" href=\"{}\">{body}</a>", escape(href)),
                None => format!("<div class=\"metric-card\">{body}</div>"),
            }
        })
        .collect();
    Markup::raw(format!("<div class=\"metrics-grid\">{cards}</div>"))
}

/// Card for one account, with an optional password reset action
#[must_use]
pub fn user_card(user: &UserAccount, reset_action: Option<&str>) -> Markup {
    let role = user.role.as_deref().unwrap_or_default();
    let mut html = Markup::raw(format!(
        "<div class=\"user-card role-{}\"><div class=\"user-card-head\">{}<div><h3>{}</h3>",
        escape(role),
        avatar(&user.username),
        escape(&user.username)
    ));
    if let Some(designation) = user.designation.as_deref().filter(|d| !d.is_empty()) {
        html.push_raw(&format!("<p class=\"designation\">{}</p>", escape(designation)));
    }
    html.push_raw("</div>");
    if !role.is_empty() {
        html.push_raw(&format!(
            "<div class=\"role-badge\">{}</div>",
            escape(&role.replacen('_', " ", 1).to_uppercase())
        ));
    }
    html.push_raw("</div>");

    html.push_raw(&format!(
        "<div class=\"user-card-row\"><span>Email:</span> <span>{}</span></div>",
        escape(user.email.as_deref().unwrap_or_default())
    ));
    match &user.organization {
        Some(org) => html.push_raw(&format!(
            "<div class=\"user-card-row\"><span>Organization:</span> <span>{}</span></div>",
            escape(&org.name)
        )),
        None => html.push_raw("<div class=\"user-card-row muted\">No organization</div>"),
    }
    if let Some(created) = user.created_at.as_deref() {
        html.push_raw(&format!(
            "<div class=\"user-card-row\"><span>Joined:</span> <span>{}</span></div>",
            escape(created)
        ));
    }
    if let Some(action) = reset_action {
        html.push_raw(&format!(
            "<form method=\"post\" action=\"{}\" data-confirm=\"Are you sure you want to reset the password for {}? A new password will be generated and sent to their email.\">\
             <button type=\"submit\" class=\"reset-password\">Reset Password</button></form>",
            escape(action),
            escape(&user.username)
        ));
    }
    html.push_raw("</div>");
    html
}

/// Search form submitting `q` to `action`
#[must_use]
pub fn search_bar(action: &str, placeholder: &str, query: &str) -> Markup {
    let mut html = Markup::raw(format!(
        "<form class=\"search-box\" method=\"get\" action=\"{}\"><div class=\"search-input\">\
         <input type=\"text\" name=\"q\" placeholder=\"{}\" value=\"{}\">",
        escape(action),
        escape(placeholder),
        escape(query)
    ));
    if !query.is_empty() {
        html.push_raw(&format!(
            "<a class=\"search-clear\" href=\"{}\" title=\"Clear search\">✕</a>",
            escape(action)
        ));
    }
    html.push_raw("</div></form>");
    html
}

/// Spinner with a message
#[must_use]
pub fn loading(message: &str) -> Markup {
    Markup::raw(format!(
        "<div class=\"loading\"><div class=\"spinner\"></div><p>{}</p></div>",
        escape(message)
    ))
}

/// Empty state
#[must_use]
pub fn no_data(icon: &str, message: &str, desc: Option<&str>) -> Markup {
    let desc = desc
        .map(|d| format!("<p>{}</p>", escape(d)))
        .unwrap_or_default();
    Markup::raw(format!(
        "<div class=\"no-data\"><div class=\"no-data-icon\">{}</div><h3>{}</h3>{desc}</div>",
        escape(icon),
        escape(message)
    ))
}

/// Inline failure of one panel; the rest of the page stays usable
#[must_use]
pub fn error_banner(message: &str) -> Markup {
    Markup::raw(format!(
        "<div class=\"error-banner\" role=\"alert\"><h3>Error Loading Data</h3><p>{}</p></div>",
        escape(message)
    ))
}

/// Course request status pill
#[must_use]
pub fn status_badge(status: RequestStatus) -> Markup {
    let (class, icon) = match status {
        RequestStatus::Pending => ("orange", "⏳"),
        RequestStatus::Approved => ("green", "✅"),
        RequestStatus::Rejected => ("red", "❌"),
        RequestStatus::Unknown => ("gray", "•"),
    };
    Markup::raw(format!(
        "<span class=\"status-badge {class}\">{icon} {}</span>",
        status.as_str().to_uppercase()
    ))
}

/// Chart types the browser-side charting script understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

impl ChartKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Pie => "pie",
        }
    }
}

/// Placeholder a charting script fills in
///
/// The element carries `data-chart`, `data-x`, `data-y` and the records as
/// JSON in `data-points`.
#[must_use]
pub fn chart_placeholder(kind: ChartKind, title: &str, records: &[Value], x: &str, y: &str) -> Markup {
    if records.is_empty() {
        return crate::cards::render_empty_card(title, "chart-card");
    }
    let points = serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string());
    Markup::raw(format!(
        "<div class=\"section chart-card\"><h3>{}</h3><div class=\"chart\" data-chart=\"{}\" data-x=\"{}\" data-y=\"{}\" data-points=\"{}\"></div></div>",
        escape(title),
        kind.as_str(),
        escape(x),
        escape(y),
        escape(&points)
    ))
}

/// Placeholder for pages the console does not offer yet
#[must_use]
pub fn coming_soon() -> Markup {
    Markup::raw("<div class=\"coming-soon\"><h3>Coming Soon</h3><p>features coming soon...</p></div>")
}
