//! Two-factor enrollment and removal for the signed-in admin.

use axum::{extract::State, Json};
use chrono::Utc;
use domain::services::two_factor;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CodeRequest {
    #[validate(length(min = 1, message = "Verification code is required"))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub secret: String,
    pub provisioning_uri: String,
    /// Payload to render as a QR code; identical to the provisioning URI.
    pub qr_payload: String,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorResponse {
    pub success: bool,
    pub message: &'static str,
    pub two_factor_enabled: bool,
}

/// POST /api/v1/admin/2fa/setup
///
/// Starts (or restarts) enrollment with a fresh candidate secret.
pub async fn setup(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
) -> Result<Json<SetupResponse>, ApiError> {
    let user_id = session
        .auth
        .principal()
        .map(|p| p.user_id.clone())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
    let user = state
        .users
        .get(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin profile not found".into()))?;

    let ticket = two_factor::begin_enrollment(&mut session, &user, &state.config.reports.totp_issuer)?;
    state.sessions.save(&session).await?;

    info!(user_id = %user.id, "Two-factor enrollment started");
    Ok(Json(SetupResponse {
        qr_payload: ticket.provisioning_uri.clone(),
        secret: ticket.secret,
        provisioning_uri: ticket.provisioning_uri,
    }))
}

/// POST /api/v1/admin/2fa/verify
pub async fn verify(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Json(request): Json<CodeRequest>,
) -> Result<Json<TwoFactorResponse>, ApiError> {
    request.validate()?;
    let now = Utc::now();

    let result = two_factor::confirm_enrollment(&mut session, request.code.trim(), now);
    // The candidate secret is consumed either way.
    state.sessions.save(&session).await?;
    let secret = result?;

    let user_id = session
        .auth
        .principal()
        .map(|p| p.user_id.clone())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
    state.users.enable_two_factor(&user_id, &secret, now).await?;

    Ok(Json(TwoFactorResponse {
        success: true,
        message: "Two-factor authentication enabled successfully",
        two_factor_enabled: true,
    }))
}

/// POST /api/v1/admin/2fa/disable
pub async fn disable(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<CodeRequest>,
) -> Result<Json<TwoFactorResponse>, ApiError> {
    request.validate()?;
    let now = Utc::now();

    let principal = session.principal()?;
    let user = state
        .users
        .get(&principal.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin profile not found".into()))?;

    two_factor::verify_disable(&user, request.code.trim(), now)?;
    state.users.disable_two_factor(&user.id, now).await?;

    Ok(Json(TwoFactorResponse {
        success: true,
        message: "Two-factor authentication disabled successfully",
        two_factor_enabled: false,
    }))
}
