//! Emergency alert broadcasts and the response lists attached to them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::emergency_alert::{
    AddPersonRequest, CreateAlertRequest, PersonResponse, RemovePersonRequest,
};
use domain::models::EmergencyAlert;
use domain::services::views::sort_newest_first;
use serde::Serialize;
use validator::Validate;

use super::ActionResponse;
use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct AlertListResponse {
    pub alerts: Vec<EmergencyAlert>,
    pub total: usize,
}

fn alert_not_found() -> ApiError {
    ApiError::NotFound("Emergency alert not found".into())
}

/// GET /api/v1/emergency-alerts
pub async fn list_alerts(State(state): State<AppState>) -> Result<Json<AlertListResponse>, ApiError> {
    let mut alerts = state.alerts.list().await?;
    sort_newest_first(&mut alerts, |a| a.date_created);
    Ok(Json(AlertListResponse {
        total: alerts.len(),
        alerts,
    }))
}

/// GET /api/v1/emergency-alerts/:id
pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> Result<Json<EmergencyAlert>, ApiError> {
    let alert = state.alerts.get(&alert_id).await?.ok_or_else(alert_not_found)?;
    Ok(Json(alert))
}

/// POST /api/v1/emergency-alerts
pub async fn create_alert(
    State(state): State<AppState>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<EmergencyAlert>), ApiError> {
    request.validate()?;
    if request.emergency_type.trim().is_empty() {
        return Err(ApiError::Validation("emergency_type is required".into()));
    }

    let alert = state.alerts.create(&request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// DELETE /api/v1/emergency-alerts/:id (also /api/v1/alerts/:id)
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    if !state.alerts.delete(&alert_id).await? {
        return Err(alert_not_found());
    }
    Ok(Json(ActionResponse::ok("Alert deleted successfully")))
}

/// POST /api/v1/emergency-alerts/:id/add-person
///
/// A user already on the list has their entry replaced.
pub async fn add_person(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    Json(request): Json<AddPersonRequest>,
) -> Result<Json<EmergencyAlert>, ApiError> {
    let list = request.list().map_err(ApiError::Validation)?;
    let user_id = request.person.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::Validation("userId is required".into()));
    }

    let person = PersonResponse::new(
        user_id,
        request.person.date_created.unwrap_or_else(Utc::now),
    );
    let alert = state
        .alerts
        .add_person(&alert_id, list, person)
        .await?
        .ok_or_else(alert_not_found)?;
    Ok(Json(alert))
}

/// POST /api/v1/emergency-alerts/:id/remove-person
pub async fn remove_person(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    Json(request): Json<RemovePersonRequest>,
) -> Result<Json<EmergencyAlert>, ApiError> {
    let list = request.list().map_err(ApiError::Validation)?;

    let alert = state
        .alerts
        .remove_person(&alert_id, list, request.person_id.trim())
        .await?
        .ok_or_else(alert_not_found)?;
    Ok(Json(alert))
}
