//! Console server tests against a mock LMS backend

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use pretty_assertions::assert_eq;
use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_health_check() {
    let console = TestConsole::start().await;
    let response = console.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["views"], 0);
    assert_eq!(body["backend"], console.backend.uri());
}

#[tokio::test]
async fn test_console_without_session_is_signed_out() {
    let console = TestConsole::start().await;
    let response = console.get("/console", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Sign in required"));
}

#[tokio::test]
async fn test_expired_token_is_signed_out() {
    let console = TestConsole::start().await;
    let token = mint_token_expiring("root", "admin", chrono::Utc::now().timestamp() - 60);
    let response = console.get("/console", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("token expired"));
}

#[tokio::test]
async fn test_employee_role_is_unauthorized() {
    let console = TestConsole::start().await;
    let token = mint_token("jane", "employee");
    let response = console.get("/console", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let html = body_text(response).await;
    assert!(html.contains("Unauthorized Access"));
    assert!(html.contains("'employee'"));
    assert_eq!(console.state.view_count(), 0);
}

#[tokio::test]
async fn test_admin_dashboard_renders_stats() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_unread(&console.backend, 3).await;

    let token = mint_token("root", "admin");
    let response = console.get("/console", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Total Users"));
    assert!(html.contains("120"));
    assert!(html.contains("Acme"));
    assert!(html.contains("/static/console.js"));
    assert_eq!(console.state.view_count(), 1);
    assert_eq!(console.state.panel_key("root").as_deref(), Some("root/dashboard"));
}

#[tokio::test]
async fn test_unknown_page_redirects_home() {
    let console = TestConsole::start().await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token("root", "admin");

    let response = console.get("/console/employees", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/console");
}

#[tokio::test]
async fn test_users_page_filters_by_query() {
    let console = TestConsole::start().await;
    mount_unread(&console.backend, 0).await;
    Mock::given(method("GET"))
        .and(path("/api/admin/all_users"))
        .and(query_param("username", "root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "users": [
                {"id": 1, "username": "alice", "email": "alice@acme.com", "role": "employee"},
                {"id": 2, "username": "bruno", "email": "bruno@globex.com", "role": "employee"}
            ]
        })))
        .mount(&console.backend)
        .await;

    let token = mint_token("root", "admin");
    let response = console.get("/console/total_users?q=globex", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("bruno"));
    assert!(!html.contains("alice@acme.com"));
}

#[tokio::test]
async fn test_backend_failure_renders_error_banner() {
    let console = TestConsole::start().await;
    mount_unread(&console.backend, 0).await;
    Mock::given(method("GET"))
        .and(path("/api/admin/system_stats"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"success": false, "error": "database down"})))
        .mount(&console.backend)
        .await;

    let token = mint_token("root", "admin");
    let response = console.get("/console", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("database down"));
}

#[tokio::test]
async fn test_portal_dashboard_renders_headline() {
    let console = TestConsole::start().await;
    mount_unread(&console.backend, 0).await;
    Mock::given(method("GET"))
        .and(path("/api/portal_admin/organization_statistics"))
        .and(query_param("username", "acme_admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "organization": {
                "id": 2,
                "name": "Acme",
                "total_employees": 30,
                "total_courses": 4,
                "overall_completion_rate": 55.0,
                "employees_at_risk": 0
            },
            "course_statistics": [],
            "employee_statistics": [],
            "employees_at_risk": []
        })))
        .mount(&console.backend)
        .await;

    let token = mint_token("acme_admin", "portal_admin");
    let response = console.get("/console", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Total Employees"));
    assert!(html.contains("No Employee at risk"));
}

#[tokio::test]
async fn test_session_handoff_sets_cookies() {
    let console = TestConsole::start().await;
    let token = mint_token("root", "admin");

    let response = console
        .get(&format!("/session?token={token}&refresh_token=r-1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with(&format!("impact_token={token}")));
    assert!(cookies[1].starts_with("impact_refresh=r-1"));
}

#[tokio::test]
async fn test_cookie_session_reaches_console() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token("root", "admin");

    let request = Request::builder()
        .uri("/console")
        .header(header::COOKIE, format!("theme=dark; impact_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = console.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_course_request_form_redirects_with_notice() {
    let console = TestConsole::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/approve_course_request"))
        .and(body_partial_json(json!({
            "request_id": 5,
            "action": "approve",
            "admin_username": "root",
            "admin_notes": "ok"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Request approved"})))
        .expect(1)
        .mount(&console.backend)
        .await;

    let token = mint_token("root", "admin");
    let response = console
        .post_form(
            "/api/course-requests/5/decision",
            &token,
            "action=approve&admin_notes=+ok+",
            "http://localhost:3000/console/courses_requests",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/console/courses_requests?notice=Request%20approved"
    );
}

#[tokio::test]
async fn test_failed_form_redirects_with_failure() {
    let console = TestConsole::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/organizations/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"success": false, "error": "Organization not found"})))
        .mount(&console.backend)
        .await;

    let token = mint_token("root", "admin");
    let response = console
        .post_form(
            "/api/organizations/9/delete",
            &token,
            "",
            "http://localhost:3000/console/organization_list",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("/console/organization_list?failed="));
    assert!(location.contains("not%20found"));
}

#[tokio::test]
async fn test_admin_mutation_forbidden_for_portal_admin() {
    let console = TestConsole::start().await;
    let token = mint_token("acme_admin", "portal_admin");

    let response = console
        .post_json("/api/organizations/3/status", &token, &json!({"status": "suspended"}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_status_patch_reaches_backend() {
    let console = TestConsole::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/organizations/3/status"))
        .and(body_partial_json(json!({"status": "suspended"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Status updated"})))
        .expect(1)
        .mount(&console.backend)
        .await;

    let token = mint_token("root", "admin");
    let request = Request::builder()
        .method("PATCH")
        .uri("/api/organizations/3/status")
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Accept", "application/json")
        .body(Body::from("status=suspended"))
        .unwrap();
    let response = console.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Status updated");
}

#[tokio::test]
async fn test_assign_course_to_everyone() {
    let console = TestConsole::start().await;
    Mock::given(method("POST"))
        .and(path("/api/portal_admin/assign_course_to_all"))
        .and(body_partial_json(json!({"course_id": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Assigned to 12 employees"})))
        .expect(1)
        .mount(&console.backend)
        .await;

    let token = mint_token("acme_admin", "portal_admin");
    let response = console
        .post_json("/api/course-assignments", &token, &json!({"course_id": 4}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Assigned to 12 employees");
}

#[tokio::test]
async fn test_invalid_notification_is_rejected() {
    let console = TestConsole::start().await;
    let token = mint_token("root", "admin");

    let response = console
        .post_json(
            "/api/notifications",
            &token,
            &json!({"title": "  ", "message": "Body", "type": "announcement"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_notification_goes_to_portal_admins() {
    let console = TestConsole::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/send_notification_to_portal_admins"))
        .and(body_partial_json(json!({"title": "Maintenance", "priority": "high"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Notification sent",
            "recipients_count": 3
        })))
        .expect(1)
        .mount(&console.backend)
        .await;

    let token = mint_token("root", "admin");
    let response = console
        .post_json(
            "/api/notifications",
            &token,
            &json!({"title": "Maintenance", "message": "Tonight", "type": "announcement", "priority": "high"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Notification sent (3 recipients)");
}

#[tokio::test]
async fn test_panel_status_and_sign_out() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token("root", "admin");

    assert_eq!(console.get("/console", Some(&token)).await.status(), StatusCode::OK);

    let status = body_json(console.get("/api/panel", Some(&token)).await).await;
    assert_eq!(status["key"], "root/dashboard");
    assert!(status["cycles"].as_u64().unwrap() >= 1);

    let response = console.post_form("/api/session/sign-out", &token, "", "/console").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter(|value| value.to_str().unwrap().contains("Max-Age=0"))
        .count();
    assert_eq!(cleared, 2);
    assert_eq!(console.state.view_count(), 0);
}

async fn mount_all_users(backend: &wiremock::MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/admin/all_users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "users": [{"id": 1, "username": "alice", "email": "alice@acme.com", "role": "employee"}]
        })))
        .mount(backend)
        .await;
}

async fn wait_for_pollers(console: &TestConsole, expected: usize) {
    for _ in 0..100 {
        if console.state.scheduler.active_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(console.state.scheduler.active_count(), expected);
}

#[tokio::test]
async fn test_rendered_page_embeds_panel_cycles() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token("root", "admin");

    let html = body_text(console.get("/console", Some(&token)).await).await;
    assert!(html.contains("data-panel=\"root/dashboard\" data-cycles=\"1\""));
}

#[tokio::test]
async fn test_abandoned_view_stops_polling() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token("root", "admin");

    assert_eq!(console.get("/console", Some(&token)).await.status(), StatusCode::OK);
    assert_eq!(console.state.view_count(), 1);
    wait_for_pollers(&console, 2).await;

    let later = Instant::now() + Duration::from_secs(31);
    assert_eq!(console.state.sweep_at(later, Utc::now()), 1);
    assert_eq!(console.state.view_count(), 0);
    wait_for_pollers(&console, 0).await;
}

#[tokio::test]
async fn test_expired_view_stops_polling() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token_expiring("root", "admin", Utc::now().timestamp() + 120);

    assert_eq!(console.get("/console", Some(&token)).await.status(), StatusCode::OK);
    assert_eq!(console.state.sweep_at(Instant::now(), Utc::now()), 0);

    let after_expiry = Utc::now() + chrono::Duration::seconds(121);
    assert_eq!(console.state.sweep_at(Instant::now(), after_expiry), 1);
    assert_eq!(console.state.view_count(), 0);
    wait_for_pollers(&console, 0).await;
}

#[tokio::test]
async fn test_polled_panel_survives_sweep_and_idle_one_is_dropped() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_all_users(&console.backend).await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token("root", "admin");

    assert_eq!(console.get("/console", Some(&token)).await.status(), StatusCode::OK);
    assert_eq!(console.get("/console/total_users", Some(&token)).await.status(), StatusCode::OK);
    assert_eq!(
        console.state.panel_keys("root"),
        vec!["root/dashboard".to_string(), "root/total_users".to_string()]
    );

    // Only the dashboard tab keeps polling
    tokio::time::sleep(Duration::from_millis(500)).await;
    let status = body_json(console.get("/api/panel?key=root%2Fdashboard", Some(&token)).await).await;
    assert_eq!(status["key"], "root/dashboard");

    let later = Instant::now() + Duration::from_millis(29_800);
    assert_eq!(console.state.sweep_at(later, Utc::now()), 0);
    assert_eq!(console.state.panel_keys("root"), vec!["root/dashboard".to_string()]);
    assert_eq!(console.state.panel_key("root"), None);
    wait_for_pollers(&console, 2).await;
}

#[tokio::test]
async fn test_two_pages_poll_side_by_side() {
    let console = TestConsole::start().await;
    mount_system_stats(&console.backend).await;
    mount_all_users(&console.backend).await;
    mount_unread(&console.backend, 0).await;
    let token = mint_token("root", "admin");

    assert_eq!(console.get("/console", Some(&token)).await.status(), StatusCode::OK);
    assert_eq!(console.get("/console/total_users", Some(&token)).await.status(), StatusCode::OK);
    assert_eq!(console.get("/console", Some(&token)).await.status(), StatusCode::OK);
    wait_for_pollers(&console, 3).await;

    let dashboard = body_json(console.get("/api/panel?key=root%2Fdashboard", Some(&token)).await).await;
    assert_eq!(dashboard["key"], "root/dashboard");
    assert_eq!(dashboard["cycles"], 1);

    let users = body_json(console.get("/api/panel?key=root%2Ftotal_users", Some(&token)).await).await;
    assert_eq!(users["key"], "root/total_users");
    assert_eq!(users["cycles"], 1);

    let missing = body_json(console.get("/api/panel?key=root%2Fanalytics", Some(&token)).await).await;
    assert_eq!(missing["key"], serde_json::Value::Null);
    assert_eq!(missing["cycles"], 0);
}

#[tokio::test]
async fn test_static_assets_and_fallback() {
    let console = TestConsole::start().await;

    let css = console.get("/static/console.css", None).await;
    assert_eq!(css.status(), StatusCode::OK);
    assert!(css.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/css"));

    let missing = console.get("/nowhere", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
