//! Route definitions for the console

use crate::{
    handlers::{api, pages},
    middleware::request_logging,
    state::SharedState,
};
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::compression::CompressionLayer;

/// Console pages, sign-in hand-off and static assets
pub fn page_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(pages::root))
        .route("/console", get(pages::console_home))
        .route("/console/:page", get(pages::console_page))
        .route("/session", get(pages::start_session))
        .route("/static/console.css", get(pages::stylesheet))
        .route("/static/console.js", get(pages::script))
}

/// Mutations and JSON endpoints
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Panels
        .route("/api/panel", get(api::panel_status))
        .route("/api/panel/refresh", post(api::refresh_panel))
        // Admin
        .route(
            "/api/course-requests/:id/decision",
            post(api::decide_course_request),
        )
        .route("/api/organizations", post(api::create_organization))
        .route(
            "/api/organizations/:id",
            delete(api::delete_organization),
        )
        .route(
            "/api/organizations/:id/delete",
            post(api::delete_organization),
        )
        .route(
            "/api/organizations/:id/status",
            post(api::set_organization_status).patch(api::set_organization_status),
        )
        .route(
            "/api/organizations/:id/courses",
            post(api::assign_organization_courses),
        )
        .route(
            "/api/portal-admins/:username/reset-password",
            post(api::reset_portal_admin_password),
        )
        .route("/api/analytics/export", post(api::export_analytics))
        // Portal admin
        .route("/api/course-assignments", post(api::assign_course))
        .route(
            "/api/course-assignments/remove",
            post(api::unassign_course),
        )
        // Both consoles
        .route("/api/notifications", post(api::send_notification))
        .route("/api/notifications/unread", get(api::unread_count))
        .route("/api/session/sign-out", post(api::sign_out))
}

/// Build the complete console router
pub fn build_routes() -> Router<SharedState> {
    Router::new()
        .merge(page_routes())
        .merge(api_routes())
        .route("/health", get(api::health_check))
        .fallback(pages::not_found)
        .layer(middleware::from_fn(request_logging))
        .layer(CompressionLayer::new())
}
