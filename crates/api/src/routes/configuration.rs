//! Emergency hotline configuration.

use axum::{extract::State, Json};
use chrono::Utc;
use domain::models::configuration::UpdateSettingsRequest;
use domain::models::EmergencySettings;
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;

#[derive(Debug, Serialize)]
pub struct SettingsUpdateResponse {
    pub success: bool,
    pub message: &'static str,
    pub settings: EmergencySettings,
}

/// GET /api/v1/configuration
pub async fn get_configuration(
    State(state): State<AppState>,
) -> Result<Json<EmergencySettings>, ApiError> {
    Ok(Json(state.configuration.emergency_settings().await?))
}

/// PUT /api/v1/configuration
pub async fn update_configuration(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsUpdateResponse>, ApiError> {
    request.validate()?;

    let settings = state
        .configuration
        .update_emergency_number(&request.emergency_number, &session.actor(), Utc::now())
        .await?;

    Ok(Json(SettingsUpdateResponse {
        success: true,
        message: "Emergency number updated successfully",
        settings,
    }))
}
