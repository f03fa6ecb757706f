//! Shared fixtures for the integration tests.
//!
//! Every test runs the full router over the in-memory store adapters, so no
//! external services are needed.

// Not every test file uses every helper.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use domain::models::user::CreateUserRequest;
use domain::models::{User, UserRole};
use rizalert_api::app::{create_app, AppState, Backends};
use rizalert_api::config::Config;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Base32 TOTP secret used for seeded admins.
pub const TEST_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
pub const ADMIN_EMAIL: &str = "admin@rizal.gov.ph";
pub const ADMIN_USERNAME: &str = "mdrrmo";
pub const ADMIN_PASSWORD: &str = "rescue-2024";
pub const COOKIE_NAME: &str = "rizalert_session";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_overrides(&[])
    }

    pub fn with_overrides(overrides: &[(&str, &str)]) -> Self {
        let config = Config::load_for_test(overrides).unwrap();
        let state = AppState::new(config, Backends::in_memory());
        Self {
            router: create_app(state.clone()),
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Creates a user through the repository.
    pub async fn seed_user(&self, username: &str, role: UserRole, barangay: Option<&str>) -> User {
        let request = CreateUserRequest {
            username: username.to_string(),
            email: format!("{}@example.ph", username),
            password: "citizen-pass".to_string(),
            full_name: format!("{} Dela Cruz", username),
            address: None,
            role: Some(role),
            department: None,
            status: None,
            municipality: None,
            barangay: barangay.map(str::to_string),
        };
        self.state.users.create(&request, Utc::now()).await.unwrap()
    }

    /// Creates the admin account, optionally with 2FA already enabled.
    pub async fn seed_admin(&self, with_two_factor: bool) -> User {
        let request = CreateUserRequest {
            username: ADMIN_USERNAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            full_name: "Maria Santos".to_string(),
            address: None,
            role: Some(UserRole::Admin),
            department: None,
            status: None,
            municipality: None,
            barangay: None,
        };
        let user = self.state.users.create(&request, Utc::now()).await.unwrap();
        if with_two_factor {
            self.state
                .users
                .enable_two_factor(&user.id, TEST_SECRET, Utc::now())
                .await
                .unwrap();
        }
        self.state.users.get(&user.id).await.unwrap().unwrap()
    }

    /// Seeds a 2FA-enabled admin, logs in with password and code, and
    /// returns the `Cookie` header value for the full session.
    pub async fn login_admin(&self) -> String {
        self.seed_admin(true).await;
        let response = self
            .send(json_request(
                Method::POST,
                "/api/v1/auth/login",
                json!({
                    "identifier": ADMIN_EMAIL,
                    "password": ADMIN_PASSWORD,
                    "code": current_code(TEST_SECRET),
                }),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets a session cookie")
    }
}

/// The code an authenticator app would show right now.
pub fn current_code(secret: &str) -> String {
    shared::totp::generate_code(secret, Utc::now().timestamp() as u64).unwrap()
}

/// A six-digit code that is not currently valid for `secret`.
pub fn wrong_code(secret: &str) -> String {
    let now = Utc::now().timestamp() as u64;
    let valid: Vec<String> = [now - 30, now, now + 30]
        .iter()
        .map(|t| shared::totp::generate_code(secret, *t).unwrap())
        .collect();
    (0..1_000_000u32)
        .map(|n| format!("{:06}", n))
        .find(|c| !valid.contains(c))
        .unwrap()
}

/// `Cookie` header value from a response's session Set-Cookie, if any.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", COOKIE_NAME)) && pair.len() > COOKIE_NAME.len() + 1)
        .map(str::to_string)
}

pub fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete_request(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn parse_response_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap_or(Value::Null)
}
