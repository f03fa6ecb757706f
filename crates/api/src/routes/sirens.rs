//! Siren control: current state, switching and the activation log.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use domain::models::siren::{SirenChange, SirenLog};
use domain::models::{SirenAction, SirenStates, SirenType};
use persistence::repositories::sirens::LOG_LIMIT;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;
use crate::middleware::metrics::record_siren_change;

#[derive(Debug, Serialize)]
pub struct SirensView {
    pub sirens: SirenStates,
    pub activations: Vec<SirenLog>,
    pub deactivations: Vec<SirenLog>,
}

#[derive(Debug, Serialize)]
pub struct SirenChangeResponse {
    #[serde(flatten)]
    pub change: SirenChange,
    pub message: String,
}

fn parse_siren(raw: &str) -> Result<SirenType, ApiError> {
    raw.parse().map_err(ApiError::Validation)
}

/// GET /api/v1/sirens
pub async fn sirens_view(State(state): State<AppState>) -> Result<Json<SirensView>, ApiError> {
    let sirens = state.sirens.states().await?;
    let activations = state
        .sirens
        .recent_logs(SirenAction::Activated, LOG_LIMIT)
        .await?;
    let deactivations = state
        .sirens
        .recent_logs(SirenAction::Deactivated, LOG_LIMIT)
        .await?;

    Ok(Json(SirensView {
        sirens,
        activations,
        deactivations,
    }))
}

/// GET /api/v1/sirens/status
pub async fn siren_status(State(state): State<AppState>) -> Result<Json<SirenStates>, ApiError> {
    Ok(Json(state.sirens.states().await?))
}

async fn apply(
    state: &AppState,
    session: &CurrentSession,
    raw_type: &str,
    target: Option<bool>,
) -> Result<Json<SirenChangeResponse>, ApiError> {
    let siren = parse_siren(raw_type)?;
    let actor = session.actor();
    let now = Utc::now();

    let change = match target {
        Some(active) => state.sirens.set_state(siren, active, &actor, now).await?,
        None => state.sirens.toggle(siren, &actor, now).await?,
    };
    record_siren_change(siren.as_str(), change.action.as_str());

    Ok(Json(SirenChangeResponse {
        message: change.message(siren),
        change,
    }))
}

/// POST /api/v1/sirens/:siren_type/toggle
pub async fn toggle(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(siren_type): Path<String>,
) -> Result<Json<SirenChangeResponse>, ApiError> {
    apply(&state, &session, &siren_type, None).await
}

/// POST /api/v1/sirens/:siren_type/activate
pub async fn activate(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(siren_type): Path<String>,
) -> Result<Json<SirenChangeResponse>, ApiError> {
    apply(&state, &session, &siren_type, Some(true)).await
}

/// POST /api/v1/sirens/:siren_type/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(siren_type): Path<String>,
) -> Result<Json<SirenChangeResponse>, ApiError> {
    apply(&state, &session, &siren_type, Some(false)).await
}
