//! Dashboard and report data, as JSON and as server-rendered pages.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_bytes, get_request, json_request, parse_response_body, TestApp};
use domain::models::UserRole;
use serde_json::{json, Value};

async fn report(app: &TestApp, cookie: &str, case_type: &str, user_id: &str) -> Value {
    parse_response_body(
        app.send(json_request(
            Method::POST,
            "/api/v1/emergencies",
            json!({ "case_type": case_type, "user_id": user_id }),
            Some(cookie),
        ))
        .await,
    )
    .await
}

async fn page_text(app: &TestApp, uri: &str, cookie: &str) -> String {
    let response = app.send(get_request(uri, Some(cookie))).await;
    assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    let content_type = response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"), "{}", content_type);
    String::from_utf8(body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_dashboard() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;
    let juan = app.seed_user("juan", UserRole::Citizen, Some("Pitogo")).await;
    let fire = report(&app, &cookie, "FIRE", &juan.id).await;
    report(&app, &cookie, "MEDICAL", &juan.id).await;

    app.send(json_request(
        Method::PUT,
        &format!("/api/v1/emergencies/{}", fire["id"].as_str().unwrap()),
        json!({ "status": "RESOLVED", "isActive": false }),
        Some(&cookie),
    ))
    .await;

    let response = app.send(get_request("/api/v1/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;

    assert_eq!(body["total_users"], 2);
    assert_eq!(body["active_alerts"].as_array().unwrap().len(), 1);
    assert_eq!(body["active_alerts"][0]["case_type"], "MEDICAL");
    assert_eq!(body["resolved_rates"]["fire"], 100.0);
    assert_eq!(body["resolved_rates"]["medical"], 0.0);
    assert_eq!(body["yearly_stats"]["Fire"], 1);
    assert_eq!(body["yearly_stats"]["Typhoon"], 0);
    assert_eq!(body["recent_cases"].as_array().unwrap().len(), 2);
    assert!(body["recent_cases"][0]["time_ago"]
        .as_str()
        .unwrap()
        .ends_with("ago"));
}

#[tokio::test]
async fn test_reports_filter_by_barangay() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;
    let juan = app.seed_user("juan", UserRole::Citizen, Some("Pitogo")).await;
    let ana = app.seed_user("ana", UserRole::Responder, Some("Aguas")).await;
    report(&app, &cookie, "FIRE", &juan.id).await;
    report(&app, &cookie, "CRIME", &ana.id).await;
    report(&app, &cookie, "FLOOD", &ana.id).await;

    let body = parse_response_body(app.send(get_request("/api/v1/reports", Some(&cookie))).await).await;
    assert_eq!(body["total_emergencies"], 3);
    assert_eq!(body["total_users"], 3);
    assert_eq!(body["filter"]["municipality"], "Rizal");
    assert_eq!(body["status_counts"]["pending"], 3);
    assert!(body["case_type_stats"].get("Flood").is_none());
    assert_eq!(body["case_type_stats"]["Crime"], 1);
    assert_eq!(body["monthly_data"].as_array().unwrap().len(), 6);
    let pitogo = body["barangay_stats"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["barangay"] == "Pitogo")
        .unwrap()
        .clone();
    assert_eq!(pitogo["count"], 1);

    let body = parse_response_body(
        app.send(get_request("/api/v1/reports?barangay=Aguas", Some(&cookie)))
            .await,
    )
    .await;
    assert_eq!(body["filter"]["barangay"], "Aguas");
    assert_eq!(body["total_emergencies"], 2);
    assert_eq!(body["total_users"], 1);
    assert_eq!(body["overall_emergencies"], 3);
    assert_eq!(body["role_stats"]["responder"], 1);
    assert_eq!(body["role_stats"]["admin"], 0);
}

#[tokio::test]
async fn test_dashboard_page_renders() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;
    let juan = app.seed_user("juan", UserRole::Citizen, None).await;
    report(&app, &cookie, "FIRE", &juan.id).await;

    let html = page_text(&app, "/admin/dashboard", &cookie).await;
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Recent Cases"));
    assert!(html.contains("juan Dela Cruz"));
}

#[tokio::test]
async fn test_pages_escape_user_content() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;

    app.send(json_request(
        Method::POST,
        "/api/v1/emergency-alerts",
        json!({
            "emergency_type": "<script>alert(1)</script>",
            "emergency_descriptions": "Stay & wait"
        }),
        Some(&cookie),
    ))
    .await;

    let html = page_text(&app, "/admin/alerts", &cookie).await;
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(html.contains("Stay &amp; wait"));
}

#[tokio::test]
async fn test_reports_page_scope() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;

    let html = page_text(&app, "/admin/reports?barangay=Pitogo", &cookie).await;
    assert!(html.contains("Scope: Pitogo, Rizal"));

    let html = page_text(&app, "/admin/reports", &cookie).await;
    assert!(html.contains("Scope: All barangays, Rizal"));
}

#[tokio::test]
async fn test_pages_require_admin_session() {
    let app = TestApp::new();
    for uri in ["/admin/dashboard", "/admin/reports", "/admin/alerts", "/api/v1/dashboard"] {
        let response = app.send(get_request(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}
