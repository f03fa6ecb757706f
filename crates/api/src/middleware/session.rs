//! Admin session middleware.
//!
//! Loads the server-side session named by the session cookie and gates
//! routes on its login state:
//! - [`require_session`]: provisional (2FA setup pending) or full session
//! - [`require_admin`]: full session only
//!
//! The loaded session is stored in request extensions for the
//! [`CurrentSession`](crate::extractors::CurrentSession) extractor. Sessions
//! past half of their lifetime are extended and the cookie is reissued.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use domain::models::AdminSession;
use shared::crypto::is_valid_session_token;
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::logging::fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    AnyPrincipal,
    FullAdmin,
}

/// Loads the session named by the request's cookie, if it exists and has
/// not expired.
pub async fn load_session(
    state: &AppState,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Option<AdminSession>, ApiError> {
    let Some(id) = state
        .cookies
        .extract_session_id(headers)
        .filter(|id| is_valid_session_token(id))
    else {
        return Ok(None);
    };
    Ok(state.sessions.load(id, now).await?)
}

/// True when less than half of the configured lifetime remains.
fn needs_refresh(session: &AdminSession, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
    session.expires_at - now < ttl / 2
}

async fn authorize(
    state: AppState,
    mut req: Request<Body>,
    next: Next,
    requirement: Requirement,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let mut session = load_session(&state, req.headers(), now)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

    if session.auth.principal().is_none() {
        return Err(ApiError::Unauthorized("Authentication required".into()));
    }
    if requirement == Requirement::FullAdmin && !session.auth.is_authenticated() {
        return Err(ApiError::Forbidden(
            "Two-factor authentication setup is required".into(),
        ));
    }

    let ttl = state.config.session_ttl();
    let refreshed = needs_refresh(&session, ttl, now);
    if refreshed {
        session.touch(ttl, now);
        state.sessions.save(&session).await?;
        debug!(session = %fingerprint(&session.id), "Session extended");
    }

    let session_id = session.id.clone();
    req.extensions_mut().insert(session);
    let mut response = next.run(req).await;

    if refreshed {
        state
            .cookies
            .add_session_cookie(response.headers_mut(), &session_id);
    }
    Ok(response)
}

pub async fn require_session(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    authorize(state, req, next, Requirement::AnyPrincipal)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    authorize(state, req, next, Requirement::FullAdmin)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}
