//! Role-gated console shells
//!
//! A [`Shell`] is chosen once per request from the decoded session. It owns
//! the menu, the page titles, and the sidebar collapse rule; pages only
//! produce the content area.

use impact_core::session::{Role, Session};

use crate::components::{self, HeaderProps, MenuLink};
use crate::device::Device;
use crate::render::{Markup, escape};

/// Pages of the super admin console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AdminPage {
    #[default]
    Dashboard,
    OrganizationStats,
    OrganizationList,
    PortalAdmins,
    TotalUsers,
    Courses,
    Simulations,
    CourseRequests,
    Analytics,
    Settings,
    Payment,
}

impl AdminPage {
    /// Menu order
    pub const ALL: [Self; 11] = [
        Self::Dashboard,
        Self::OrganizationStats,
        Self::OrganizationList,
        Self::PortalAdmins,
        Self::TotalUsers,
        Self::Courses,
        Self::Simulations,
        Self::CourseRequests,
        Self::Analytics,
        Self::Settings,
        Self::Payment,
    ];

    /// Path segment under `/console/`
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::OrganizationStats => "organization_stats",
            Self::OrganizationList => "organization_list",
            Self::PortalAdmins => "portal_admins",
            Self::TotalUsers => "total_users",
            Self::Courses => "courses",
            Self::Simulations => "simulations",
            Self::CourseRequests => "courses_requests",
            Self::Analytics => "analytics",
            Self::Settings => "settings",
            Self::Payment => "payment",
        }
    }

    const fn entry(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Dashboard => ("Dashboard", "📊", "#3b82f6"),
            Self::OrganizationStats => ("Organization Stats", "📈", "#8b5cf6"),
            Self::OrganizationList => ("Organization list", "🏢", "#10b981"),
            Self::PortalAdmins => ("Portal Admins", "👥", "#ec4899"),
            Self::TotalUsers => ("Total Users", "👤", "#3b82f6"),
            Self::Courses => ("Courses", "📚", "#f59e0b"),
            Self::Simulations => ("Simulations", "⚙", "#06b6d4"),
            Self::CourseRequests => ("Course Requests", "🛒", "#ec4899"),
            Self::Analytics => ("Analytics", "📊", "#8b5cf6"),
            Self::Settings => ("Settings", "⚙", "#6b7280"),
            Self::Payment => ("Payment", "💳", "#ef4444"),
        }
    }

    /// Header title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard Overview",
            Self::Settings => "System Settings",
            _ => "Admin Panel",
        }
    }

    /// Whether the console renders real content for this page
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        !matches!(
            self,
            Self::Courses | Self::Simulations | Self::Settings | Self::Payment
        )
    }
}

/// Pages of the tenant admin console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PortalPage {
    #[default]
    Dashboard,
    Employees,
    Courses,
    Progress,
    Analytics,
    Settings,
}

impl PortalPage {
    /// Menu order
    pub const ALL: [Self; 6] = [
        Self::Dashboard,
        Self::Employees,
        Self::Courses,
        Self::Progress,
        Self::Analytics,
        Self::Settings,
    ];

    /// Path segment under `/console/`
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Employees => "employees",
            Self::Courses => "courses",
            Self::Progress => "progress",
            Self::Analytics => "analytics",
            Self::Settings => "settings",
        }
    }

    const fn entry(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Dashboard => ("Dashboard", "🏠", "#3b82f6"),
            Self::Employees => ("Employees", "👥", "#8b5cf6"),
            Self::Courses => ("Courses", "📚", "#f59e0b"),
            Self::Progress => ("Employee Progress", "📈", "#10b981"),
            Self::Analytics => ("Analytics", "📊", "#8b5cf6"),
            Self::Settings => ("Settings", "⚙", "#6b7280"),
        }
    }

    /// Header title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard Overview",
            Self::Employees => "Employees Management",
            Self::Settings => "System Settings",
            Self::Analytics => "Analytics Management",
            Self::Courses => "Courses Management",
            Self::Progress => "Portal Admin Panel",
        }
    }

    /// Whether the console renders real content for this page
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        !matches!(self, Self::Settings)
    }
}

/// A page within a shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsolePage {
    Admin(AdminPage),
    Portal(PortalPage),
}

impl ConsolePage {
    /// Path segment under `/console/`
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Admin(page) => page.slug(),
            Self::Portal(page) => page.slug(),
        }
    }

    /// Header title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Admin(page) => page.title(),
            Self::Portal(page) => page.title(),
        }
    }

    /// Whether the console renders real content for this page
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        match self {
            Self::Admin(page) => page.is_implemented(),
            Self::Portal(page) => page.is_implemented(),
        }
    }

    /// Link to the page
    #[must_use]
    pub fn href(self) -> String {
        format!("/console/{}", self.slug())
    }
}

/// The frame a session is allowed to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shell {
    /// Super admin console
    Admin,
    /// Tenant admin console
    PortalAdmin,
    /// Any other role, carrying the raw claim for the access page
    Unauthorized { role: String },
}

impl Shell {
    /// Select the shell for a decoded session
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        match session.role {
            Some(Role::Admin) => Self::Admin,
            Some(Role::PortalAdmin) => Self::PortalAdmin,
            Some(Role::Employee) | None => Self::Unauthorized {
                role: session.raw_role.clone(),
            },
        }
    }

    /// Sidebar heading
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Admin => "🎓Impact",
            Self::PortalAdmin => "Portal Admin",
            Self::Unauthorized { .. } => "Impact",
        }
    }

    /// Resolve a path segment; no segment means the dashboard
    ///
    /// Unknown segments and the unauthorized shell resolve to `None`.
    #[must_use]
    pub fn page(&self, slug: Option<&str>) -> Option<ConsolePage> {
        let slug = slug.unwrap_or("dashboard");
        match self {
            Self::Admin => AdminPage::ALL
                .into_iter()
                .find(|page| page.slug() == slug)
                .map(ConsolePage::Admin),
            Self::PortalAdmin => PortalPage::ALL
                .into_iter()
                .find(|page| page.slug() == slug)
                .map(ConsolePage::Portal),
            Self::Unauthorized { .. } => None,
        }
    }

    /// Sidebar entries with `active` marked
    #[must_use]
    pub fn menu(&self, active: Option<ConsolePage>) -> Vec<MenuLink> {
        let pages: Vec<ConsolePage> = match self {
            Self::Admin => AdminPage::ALL.into_iter().map(ConsolePage::Admin).collect(),
            Self::PortalAdmin => PortalPage::ALL.into_iter().map(ConsolePage::Portal).collect(),
            Self::Unauthorized { .. } => Vec::new(),
        };
        pages
            .into_iter()
            .map(|page| {
                let (label, icon, color) = match page {
                    ConsolePage::Admin(p) => p.entry(),
                    ConsolePage::Portal(p) => p.entry(),
                };
                MenuLink {
                    href: page.href(),
                    label,
                    icon,
                    color,
                    active: Some(page) == active,
                }
            })
            .collect()
    }

    /// Whether the sidebar starts collapsed on this device
    #[must_use]
    pub const fn collapses_on(&self, device: Device) -> bool {
        match self {
            Self::PortalAdmin => matches!(device, Device::Mobile | Device::Tablet),
            Self::Admin | Self::Unauthorized { .. } => matches!(device, Device::Mobile),
        }
    }

    /// Role notifications are sent as from this shell
    #[must_use]
    pub const fn notification_sender(&self) -> Option<Role> {
        match self {
            Self::Admin => Some(Role::Admin),
            Self::PortalAdmin => Some(Role::PortalAdmin),
            Self::Unauthorized { .. } => None,
        }
    }

    const fn layout_class(&self) -> &'static str {
        match self {
            Self::Admin => "layout admin-view",
            Self::PortalAdmin | Self::Unauthorized { .. } => "layout",
        }
    }
}

/// Everything the frame needs besides the content
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub shell: &'a Shell,
    pub page: ConsolePage,
    pub session: &'a Session,
    pub device: Device,
    /// Explicit `sidebar=open|collapsed` choice from the query string
    pub sidebar: Option<bool>,
    pub loading: bool,
    pub unread_notifications: Option<u64>,
    /// Poll period label such as `30s`, when the page polls
    pub auto_refresh: Option<String>,
    /// Key and completed fetches of the rendered panel; the browser reloads
    /// once the count moves past this
    pub panel: Option<(String, u64)>,
}

impl Frame<'_> {
    /// Whether the sidebar renders collapsed
    #[must_use]
    pub fn collapsed(&self) -> bool {
        self.sidebar.unwrap_or_else(|| self.shell.collapses_on(self.device))
    }
}

/// Full console document around `content`
#[must_use]
pub fn render_frame(frame: &Frame<'_>, content: &Markup) -> Markup {
    let collapsed = frame.collapsed();
    let toggle = format!(
        "{}?sidebar={}",
        frame.page.href(),
        if collapsed { "open" } else { "collapsed" }
    );
    let sidebar = components::sidebar(
        frame.shell.title(),
        "Management Console",
        &frame.shell.menu(Some(frame.page)),
        collapsed,
        &toggle,
    );

    let notify = Markup::raw(format!(
        "<a class=\"send-notification\" href=\"{}?compose=notification\">📢 Send Notification</a>",
        frame.page.href()
    ));
    let header = components::dashboard_header(&HeaderProps {
        title: frame.page.title(),
        username: &frame.session.username,
        loading: frame.loading,
        refresh_href: Some("/api/panel/refresh"),
        auto_refresh: frame.auto_refresh.as_deref(),
        unread_notifications: frame.unread_notifications,
        compact: frame.device.is_mobile(),
        right: frame.shell.notification_sender().map(|_| notify),
    });

    let mut body = Markup::raw(format!(
        "<div class=\"{} device-{}\"><div class=\"sidebar{}\">",
        frame.shell.layout_class(),
        frame.device.as_str(),
        if collapsed { " collapsed" } else { "" }
    ));
    body.push(&sidebar);
    body.push_raw("</div><div class=\"main-content\"><div class=\"header\">");
    body.push(&header);
    match &frame.panel {
        Some((key, cycles)) => body.push_raw(&format!(
            "</div><div class=\"dashboard-content\" data-panel=\"{}\" data-cycles=\"{cycles}\">",
            escape(key)
        )),
        None => body.push_raw("</div><div class=\"dashboard-content\">"),
    }
    body.push(content);
    body.push_raw("</div><div class=\"footer\">");
    body.push(&footer());
    body.push_raw("</div></div></div>");

    document(frame.page.title(), &body)
}

/// Access page for roles without a console
#[must_use]
pub fn render_unauthorized(role: &str) -> Markup {
    let shown = if role.trim().is_empty() { "none" } else { role.trim() };
    let body = Markup::raw(format!(
        "<div class=\"unauthorized\"><h1>Unauthorized Access</h1>\
         <p>Your role '{}' does not have access to this console.</p>\
         <p>Required roles: {} or {}.</p>\
         <form method=\"post\" action=\"/api/session/sign-out\"><button type=\"submit\">Sign Out</button></form></div>",
        escape(shown),
        Role::Admin.label(),
        Role::PortalAdmin.label(),
    ));
    document("Unauthorized", &body)
}

/// Page shown when no valid session is present
#[must_use]
pub fn render_signed_out(reason: &str) -> Markup {
    let body = Markup::raw(format!(
        "<div class=\"unauthorized\"><h1>Sign in required</h1><p>{}</p></div>",
        escape(reason)
    ));
    document("Sign in", &body)
}

fn footer() -> Markup {
    Markup::raw(format!(
        "<footer><span>© {} Impact</span><span>v{}</span></footer>",
        chrono::Utc::now().format("%Y"),
        env!("CARGO_PKG_VERSION")
    ))
}

fn document(title: &str, body: &Markup) -> Markup {
    Markup::raw(format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{} · Impact</title><link rel=\"stylesheet\" href=\"/static/console.css\"></head>\
         <body>{body}<script src=\"/static/console.js\" defer></script></body></html>",
        escape(title)
    ))
}
