//! Console page handlers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use impact_core::session::Session;
use serde::Deserialize;
use tracing::{info, warn};

use crate::components;
use crate::device::Device;
use crate::extract::{ExtractorError, REFRESH_COOKIE, SessionUser, TOKEN_COOKIE};
use crate::pages::{PageContext, PageQuery, PanelRequest, render_panel};
use crate::render::Markup;
use crate::state::SharedState;
use crate::views::{Frame, Shell, render_frame, render_signed_out, render_unauthorized};

/// `/` goes to the console
pub async fn root() -> Redirect {
    Redirect::to("/console")
}

/// Console dashboard
pub async fn console_home(
    State(state): State<SharedState>,
    user: Result<SessionUser, ExtractorError>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    console(&state, user, None, &headers, &query).await
}

/// Any other console page
pub async fn console_page(
    State(state): State<SharedState>,
    user: Result<SessionUser, ExtractorError>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    console(&state, user, Some(&slug), &headers, &query).await
}

async fn console(
    state: &SharedState,
    user: Result<SessionUser, ExtractorError>,
    slug: Option<&str>,
    headers: &HeaderMap,
    query: &PageQuery,
) -> Response {
    let user = match user {
        Ok(user) => user,
        Err(rejection) => {
            info!(reason = %rejection.message, "Console requested without a session");
            return (StatusCode::UNAUTHORIZED, render_signed_out(&rejection.message)).into_response();
        }
    };

    let shell = Shell::for_session(&user.session);
    if let Shell::Unauthorized { role } = &shell {
        warn!(user = %user.session.username, role = %role, "Role without a console");
        return (StatusCode::FORBIDDEN, render_unauthorized(role)).into_response();
    }
    let Some(page) = shell.page(slug) else {
        return Redirect::to("/console").into_response();
    };

    let request = PanelRequest::new(page, query);
    let (content, loading, unread, panel) = match state.show(&user, &request).await {
        Ok(shown) => {
            let ctx = PageContext {
                page,
                query,
                session: &user.session,
                analytics: Some(&shown.analytics),
            };
            let loading = shown.panel.as_ref().is_some_and(|panel| panel.loading);
            let panel = shown
                .key
                .clone()
                .zip(shown.panel.as_ref().map(|panel| panel.cycles));
            (render_panel(&ctx, shown.panel.as_ref()), loading, shown.unread, panel)
        }
        Err(e) => {
            warn!(error = %e, "Panel activation failed");
            (components::error_banner(&e.to_string()), false, None, None)
        }
    };

    let auto_refresh = request
        .interval()
        .map(|tier| format!("{}s", tier.period(&state.config.refresh).as_secs()));
    let frame = Frame {
        shell: &shell,
        page,
        session: &user.session,
        device: Device::detect(query.vw, headers),
        sidebar: query.sidebar_collapsed(),
        loading,
        unread_notifications: unread,
        auto_refresh,
        panel,
    };
    render_frame(&frame, &content).into_response()
}

/// Tokens handed over by the sign-in flow
#[derive(Debug, Deserialize)]
pub struct SessionParams {
    /// Access token
    pub token: String,
    /// Refresh token
    pub refresh_token: Option<String>,
}

/// `Set-Cookie` value for a console cookie; an empty value expires it
#[must_use]
pub fn session_cookie(name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    } else {
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax")
    }
}

fn with_cookies(mut response: Response, cookies: &[String]) -> Response {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Store tokens from the sign-in redirect and open the console
pub async fn start_session(Query(params): Query<SessionParams>) -> Response {
    let session = match Session::decode_active(&params.token, chrono::Utc::now()) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Rejected session token");
            return (StatusCode::UNAUTHORIZED, render_signed_out(&e.to_string())).into_response();
        }
    };
    info!(user = %session.username, role = %session.raw_role, "Session started");

    let mut cookies = vec![session_cookie(TOKEN_COOKIE, session.token())];
    if let Some(refresh) = params.refresh_token.as_deref().filter(|t| !t.is_empty()) {
        cookies.push(session_cookie(REFRESH_COOKIE, refresh));
    }
    with_cookies(Redirect::to("/console").into_response(), &cookies)
}

/// Response that clears both session cookies
#[must_use]
pub fn signed_out(response: Response) -> Response {
    with_cookies(
        response,
        &[session_cookie(TOKEN_COOKIE, ""), session_cookie(REFRESH_COOKIE, "")],
    )
}

/// Stylesheet
pub async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!("../../static/console.css"),
    )
}

/// Browser script: confirmations, method override and panel polling
pub async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        include_str!("../../static/console.js"),
    )
}

/// Fallback page
pub async fn not_found() -> impl IntoResponse {
    let body = Markup::raw(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>Not Found · Impact</title>\
         <link rel=\"stylesheet\" href=\"/static/console.css\"></head><body><div class=\"unauthorized\">\
         <h1>Page not found</h1><p><a href=\"/console\">Back to the console</a></p></div></body></html>",
    );
    (StatusCode::NOT_FOUND, body)
}
