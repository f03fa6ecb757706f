//! Admin login, one-time code submission and logout.
//!
//! Every successful credential check starts a brand-new server-side session;
//! a cookie from an earlier session is discarded.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::{AdminSession, SessionPrincipal, User};
use domain::services::two_factor::{self, LoginOutcome, TwoFactorError};
use serde::{Deserialize, Serialize};
use shared::crypto::generate_session_token;
use tracing::{info, warn};
use validator::Validate;

use super::ActionResponse;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::logging::fingerprint;
use crate::middleware::metrics::record_login;
use crate::middleware::session::load_session;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address or username.
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// One-time code, when the admin already has it at hand.
    #[serde(default, alias = "two_factor_code")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpRequest {
    #[validate(length(min = 1, message = "Verification code is required"))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// `authenticated`, `otp_required` or `setup_required`.
    pub status: &'static str,
    pub message: &'static str,
    pub requires_2fa_setup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionPrincipal>,
}

impl LoginResponse {
    fn from_outcome(outcome: LoginOutcome, session: &AdminSession) -> Self {
        let (status, message) = match outcome {
            LoginOutcome::Authenticated => ("authenticated", "Login successful"),
            LoginOutcome::OtpRequired => ("otp_required", "Enter the code from your authenticator app"),
            LoginOutcome::SetupRequired => (
                "setup_required",
                "Two-factor authentication must be set up before continuing",
            ),
        };
        Self {
            status,
            message,
            requires_2fa_setup: outcome == LoginOutcome::SetupRequired,
            user: session.auth.principal().cloned(),
        }
    }
}

fn outcome_label(outcome: LoginOutcome) -> &'static str {
    match outcome {
        LoginOutcome::Authenticated => "authenticated",
        LoginOutcome::OtpRequired => "otp_required",
        LoginOutcome::SetupRequired => "setup_required",
    }
}

async fn authenticate(state: &AppState, request: &LoginRequest) -> Result<User, ApiError> {
    let user = state
        .users
        .find_by_login(request.identifier.trim())
        .await?
        .ok_or(TwoFactorError::InvalidCredentials)?;

    match state.users.verify_password(&user, &request.password).await {
        Ok(true) => Ok(user),
        Ok(false) => Err(TwoFactorError::InvalidCredentials.into()),
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Identity lookup failed during login");
            Err(TwoFactorError::InvalidCredentials.into())
        }
    }
}

async fn finish_login(
    state: &AppState,
    session: &AdminSession,
    user: &User,
    outcome: LoginOutcome,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    record_login(outcome_label(outcome));
    if outcome != LoginOutcome::OtpRequired {
        state.users.record_login(&user.id, now).await?;
        info!(
            user_id = %user.id,
            session = %fingerprint(&session.id),
            outcome = outcome_label(outcome),
            "Admin logged in"
        );
    }
    Ok(())
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;
    let now = Utc::now();

    if let Some(previous) = load_session(&state, &headers, now).await? {
        state.sessions.delete(&previous.id).await?;
    }

    let user = match authenticate(&state, &request).await {
        Ok(user) => user,
        Err(e) => {
            record_login("rejected");
            warn!(identifier = %request.identifier.trim(), "Login rejected");
            return Err(e);
        }
    };

    let mut session = AdminSession::new(
        generate_session_token(),
        state.config.session_ttl(),
        state.config.session.id_capacity,
        now,
    );

    let mut response_headers = HeaderMap::new();
    match two_factor::submit_credentials(&mut session, &user, request.code.as_deref(), now) {
        Ok(outcome) => {
            state.sessions.save(&session).await?;
            state
                .cookies
                .add_session_cookie(&mut response_headers, &session.id);
            finish_login(&state, &session, &user, outcome, now).await?;

            let body = LoginResponse::from_outcome(outcome, &session);
            Ok((StatusCode::OK, response_headers, Json(body)).into_response())
        }
        Err(TwoFactorError::InvalidOtp) => {
            // The password was right: keep the login waiting for a code.
            record_login("rejected");
            state.sessions.save(&session).await?;
            state
                .cookies
                .add_session_cookie(&mut response_headers, &session.id);
            Ok((response_headers, ApiError::from(TwoFactorError::InvalidOtp)).into_response())
        }
        Err(e) => {
            record_login("rejected");
            Err(e.into())
        }
    }
}

/// POST /api/v1/auth/login/otp
pub async fn login_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<OtpRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    request.validate()?;
    let now = Utc::now();

    let mut session = load_session(&state, &headers, now)
        .await?
        .ok_or(TwoFactorError::NoPendingLogin)?;
    let user_id = two_factor::pending_login(&session)
        .ok_or(TwoFactorError::NoPendingLogin)?
        .to_string();

    let Some(user) = state.users.get(&user_id).await? else {
        session.reset();
        state.sessions.save(&session).await?;
        return Err(TwoFactorError::NoPendingLogin.into());
    };

    let result = two_factor::submit_otp(&mut session, &user, request.code.trim(), now);
    state.sessions.save(&session).await?;

    match result {
        Ok(outcome) => {
            finish_login(&state, &session, &user, outcome, now).await?;
            Ok(Json(LoginResponse::from_outcome(outcome, &session)))
        }
        Err(e) => {
            record_login("rejected");
            Err(e.into())
        }
    }
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(mut session) = load_session(&state, &headers, Utc::now()).await? {
        two_factor::logout(&mut session);
        state.sessions.delete(&session.id).await?;
        info!(session = %fingerprint(&session.id), "Admin logged out");
    }

    let mut response_headers = HeaderMap::new();
    state.cookies.add_clear_cookie(&mut response_headers);
    Ok((
        response_headers,
        Json(ActionResponse::ok("Logged out successfully")),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_accepts_email_alias() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email": "admin@rizal.gov.ph", "password": "x"}"#).unwrap();
        assert_eq!(request.identifier, "admin@rizal.gov.ph");
        assert!(request.code.is_none());
    }

    #[test]
    fn test_login_request_accepts_two_factor_code_alias() {
        let request: LoginRequest = serde_json::from_str(
            r#"{"username": "admin", "password": "x", "two_factor_code": "123456"}"#,
        )
        .unwrap();
        assert_eq!(request.identifier, "admin");
        assert_eq!(request.code.as_deref(), Some("123456"));
    }

    #[test]
    fn test_login_request_validation() {
        let request = LoginRequest {
            identifier: String::new(),
            password: String::new(),
            code: None,
        };
        let errors = request.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(LoginOutcome::OtpRequired), "otp_required");
        assert_eq!(outcome_label(LoginOutcome::SetupRequired), "setup_required");
    }
}
