//! Emergency reports, their responders and the "new emergencies" badge.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use domain::models::dashboard::EmergencyView;
use domain::models::emergency::{
    AddResponderRequest, CreateEmergencyRequest, ResponderPatch, UpdateEmergencyRequest,
};
use domain::services::aggregation::created_within;
use domain::services::views::{emergency_view, index_users, sort_newest_first};
use persistence::repositories::emergencies::new_responder;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::ActionResponse;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;

/// Window for the unviewed-emergencies badge.
const BADGE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Serialize)]
pub struct EmergencyListResponse {
    pub emergencies: Vec<EmergencyView>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkViewedRequest {
    #[serde(default)]
    pub emergency_id: Option<String>,
}

fn emergency_not_found() -> ApiError {
    ApiError::NotFound("Emergency not found".into())
}

async fn require_user(state: &AppState, user_id: Option<&str>) -> Result<(), ApiError> {
    let user_id = user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("Invalid user_id".into()))?;
    match state.users.get(user_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::Validation("Invalid user_id".into())),
    }
}

async fn load_view(state: &AppState, emergency_id: &str) -> Result<EmergencyView, ApiError> {
    let emergency = state
        .emergencies
        .get(emergency_id)
        .await?
        .ok_or_else(emergency_not_found)?;
    let users = index_users(&state.users.list().await?);
    Ok(emergency_view(&emergency, &users))
}

/// GET /api/v1/emergencies
pub async fn list_emergencies(
    State(state): State<AppState>,
) -> Result<Json<EmergencyListResponse>, ApiError> {
    let emergencies = state.emergencies.list().await?;
    let users = index_users(&state.users.list().await?);

    let mut views: Vec<EmergencyView> = emergencies
        .iter()
        .map(|e| emergency_view(e, &users))
        .collect();
    sort_newest_first(&mut views, |e| e.created_at);

    Ok(Json(EmergencyListResponse {
        total: views.len(),
        emergencies: views,
    }))
}

/// GET /api/v1/emergencies/:id
pub async fn get_emergency(
    State(state): State<AppState>,
    Path(emergency_id): Path<String>,
) -> Result<Json<EmergencyView>, ApiError> {
    Ok(Json(load_view(&state, &emergency_id).await?))
}

/// POST /api/v1/emergencies
pub async fn create_emergency(
    State(state): State<AppState>,
    Json(request): Json<CreateEmergencyRequest>,
) -> Result<(StatusCode, Json<EmergencyView>), ApiError> {
    request.validate()?;
    let case_type = request
        .case_type
        .ok_or_else(|| ApiError::Validation("case_type is required".into()))?;
    require_user(&state, request.user_id.as_deref()).await?;

    let emergency = state
        .emergencies
        .create(case_type, &request, Utc::now())
        .await?;
    let users = index_users(&state.users.list().await?);
    Ok((StatusCode::CREATED, Json(emergency_view(&emergency, &users))))
}

/// PUT /api/v1/emergencies/:id
pub async fn update_emergency(
    State(state): State<AppState>,
    Path(emergency_id): Path<String>,
    Json(request): Json<UpdateEmergencyRequest>,
) -> Result<Json<EmergencyView>, ApiError> {
    request.validate()?;
    if request.user_id.is_some() {
        require_user(&state, request.user_id.as_deref()).await?;
    }

    state
        .emergencies
        .update(&emergency_id, &request, Utc::now())
        .await?
        .ok_or_else(emergency_not_found)?;
    Ok(Json(load_view(&state, &emergency_id).await?))
}

/// DELETE /api/v1/emergencies/:id
pub async fn delete_emergency(
    State(state): State<AppState>,
    Path(emergency_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    if !state.emergencies.delete(&emergency_id).await? {
        return Err(emergency_not_found());
    }
    Ok(Json(ActionResponse::ok("Emergency deleted successfully")))
}

/// POST /api/v1/emergencies/:id/add-responder
pub async fn add_responder(
    State(state): State<AppState>,
    Path(emergency_id): Path<String>,
    Json(request): Json<AddResponderRequest>,
) -> Result<Json<EmergencyView>, ApiError> {
    let responder_id = request
        .responder_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("responder_id is required".into()))?;

    let record = new_responder(responder_id, request.status, request.is_arrived, Utc::now());
    let emergency = state
        .emergencies
        .add_responder(&emergency_id, record)
        .await?
        .ok_or_else(emergency_not_found)?;

    let users = index_users(&state.users.list().await?);
    Ok(Json(emergency_view(&emergency, &users)))
}

/// POST /api/v1/emergencies/:id/update-responder
///
/// Only the supplied fields change.
pub async fn update_responder(
    State(state): State<AppState>,
    Path(emergency_id): Path<String>,
    Json(patch): Json<ResponderPatch>,
) -> Result<Json<EmergencyView>, ApiError> {
    if patch.responder_id.trim().is_empty() {
        return Err(ApiError::Validation("responder_id is required".into()));
    }

    match state
        .emergencies
        .update_responder(&emergency_id, &patch)
        .await?
    {
        None => Err(emergency_not_found()),
        Some(false) => Err(ApiError::NotFound(
            "Responder is not assigned to this emergency".into(),
        )),
        Some(true) => Ok(Json(load_view(&state, &emergency_id).await?)),
    }
}

/// GET /api/v1/emergencies/count
///
/// Emergencies from the last 24 hours this session has not opened yet.
pub async fn unviewed_count(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<CountResponse>, ApiError> {
    let emergencies = state.emergencies.list().await?;
    let count = created_within(&emergencies, Duration::hours(BADGE_WINDOW_HOURS), Utc::now())
        .filter(|e| !session.viewed_emergencies.contains(&e.id))
        .count();
    Ok(Json(CountResponse { count }))
}

/// POST /api/v1/emergencies/mark-viewed
pub async fn mark_viewed(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Json(request): Json<MarkViewedRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let emergency_id = request
        .emergency_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("emergency_id is required".into()))?;

    session.viewed_emergencies.insert(emergency_id.clone());
    state.sessions.save(&session).await?;

    info!(emergency_id = %emergency_id, "Emergency marked as viewed");
    Ok(Json(ActionResponse::ok("Emergency marked as viewed")))
}
