//! Login, one-time code and two-factor enrollment flows.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{
    current_code, get_request, json_request, parse_response_body, session_cookie, wrong_code,
    TestApp, ADMIN_EMAIL, ADMIN_PASSWORD, ADMIN_USERNAME, TEST_SECRET,
};
use domain::models::UserRole;
use persistence::store::DocumentStore;
use serde_json::json;

fn login_body(identifier: &str, password: &str) -> serde_json::Value {
    json!({ "identifier": identifier, "password": password })
}

// ============================================================================
// Password step
// ============================================================================

#[tokio::test]
async fn test_login_unknown_account_is_rejected() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            login_body("nobody@rizal.gov.ph", "whatever"),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_login_wrong_password_is_rejected() {
    let app = TestApp::new();
    app.seed_admin(true).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            login_body(ADMIN_EMAIL, "not-the-password"),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_login_record_without_identity_account_is_rejected() {
    let app = TestApp::new();
    let record = json!({
        "username": "ghost",
        "email": "ghost@rizal.gov.ph",
        "fullName": "Ghost Admin",
        "role": "admin",
        "status": "ACTIVE",
    });
    app.state
        .docs
        .create("users", record.as_object().unwrap().clone(), Some("ghost-id"))
        .await
        .unwrap();

    for identifier in ["ghost@rizal.gov.ph", "ghost"] {
        let response = app
            .send(json_request(
                Method::POST,
                "/api/v1/auth/login",
                login_body(identifier, "whatever"),
                None,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", identifier);
        assert!(session_cookie(&response).is_none());
        let body = parse_response_body(response).await;
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_login_accepts_two_factor_code_field() {
    let app = TestApp::new();
    app.seed_admin(true).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            json!({
                "email": ADMIN_EMAIL,
                "password": ADMIN_PASSWORD,
                "two_factor_code": current_code(TEST_SECRET),
            }),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "authenticated");
}

#[tokio::test]
async fn test_login_non_admin_is_forbidden() {
    let app = TestApp::new();
    app.seed_user("juan", UserRole::Citizen, Some("Pitogo")).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            login_body("juan@example.ph", "citizen-pass"),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            login_body("", ""),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

// ============================================================================
// One-time code step
// ============================================================================

#[tokio::test]
async fn test_login_by_username_then_otp() {
    let app = TestApp::new();
    app.seed_admin(true).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            login_body(ADMIN_USERNAME, ADMIN_PASSWORD),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "otp_required");
    assert!(body.get("user").is_none());

    // Waiting for the code is not a session yet.
    let response = app.send(get_request("/api/v1/admin/profile", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login/otp",
            json!({ "code": wrong_code(TEST_SECRET) }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "invalid_otp");

    // The pending login survives a wrong code.
    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login/otp",
            json!({ "code": current_code(TEST_SECRET) }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "authenticated");
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);

    let response = app.send(get_request("/api/v1/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_otp_without_pending_login() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login/otp",
            json!({ "code": "123456" }),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inline_wrong_code_keeps_login_pending() {
    let app = TestApp::new();
    app.seed_admin(true).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            json!({
                "identifier": ADMIN_EMAIL,
                "password": ADMIN_PASSWORD,
                "code": wrong_code(TEST_SECRET),
            }),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login/otp",
            json!({ "code": current_code(TEST_SECRET) }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_each_login_issues_a_new_session() {
    let app = TestApp::new();
    let first = app.login_admin().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            json!({
                "identifier": ADMIN_EMAIL,
                "password": ADMIN_PASSWORD,
                "code": current_code(TEST_SECRET),
            }),
            Some(&first),
        ))
        .await;
    let second = session_cookie(&response).unwrap();
    assert_ne!(first, second);

    let response = app.send(get_request("/api/v1/dashboard", Some(&first))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app.send(get_request("/api/v1/dashboard", Some(&second))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Enrollment
// ============================================================================

#[tokio::test]
async fn test_first_login_requires_setup_then_enrollment_upgrades_session() {
    let app = TestApp::new();
    let admin = app.seed_admin(false).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            login_body(ADMIN_EMAIL, ADMIN_PASSWORD),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "setup_required");
    assert_eq!(body["requires_2fa_setup"], true);

    // Provisional session: profile yes, admin pages no.
    let response = app.send(get_request("/api/v1/admin/profile", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.send(get_request("/api/v1/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(json_request(Method::POST, "/api/v1/admin/2fa/setup", json!({}), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let secret = body["secret"].as_str().unwrap().to_string();
    assert_eq!(secret.len(), 32);
    let uri = body["provisioning_uri"].as_str().unwrap();
    assert!(uri.starts_with("otpauth://totp/RizAlert:"));
    assert_eq!(body["qr_payload"], body["provisioning_uri"]);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/admin/2fa/verify",
            json!({ "code": current_code(&secret) }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get_request("/api/v1/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.state.users.get(&admin.id).await.unwrap().unwrap();
    assert!(stored.two_factor_enabled);
    assert!(stored.last_login.is_some());
}

#[tokio::test]
async fn test_verify_without_setup_is_rejected() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/admin/2fa/verify",
            json!({ "code": "123456" }),
            Some(&cookie),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disable_two_factor() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/admin/2fa/disable",
            json!({ "code": wrong_code(TEST_SECRET) }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/admin/2fa/disable",
            json!({ "code": current_code(TEST_SECRET) }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["two_factor_enabled"], false);

    let profile = parse_response_body(
        app.send(get_request("/api/v1/admin/profile", Some(&cookie))).await,
    )
    .await;
    assert_eq!(profile["two_factor_enabled"], false);
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    let cookie = app.login_admin().await;

    let response = app
        .send(json_request(Method::POST, "/api/v1/auth/logout", json!({}), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cleared.contains("Max-Age=0"));

    let response = app.send(get_request("/api/v1/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let app = TestApp::new();

    for uri in ["/api/v1/dashboard", "/api/v1/users", "/admin/dashboard", "/api/v1/admin/profile"] {
        let response = app.send(get_request(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = app
        .send(get_request("/api/v1/dashboard", Some("rizalert_session=not-a-token")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
