//! Dashboard summary.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use domain::models::dashboard::DashboardView;
use domain::services::views;

use crate::app::AppState;
use crate::error::ApiError;

/// Newest reports fetched for the recent-cases panel; some are dropped when
/// their reporter no longer exists.
const RECENT_FETCH_LIMIT: usize = 20;

pub(crate) async fn load_dashboard(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<DashboardView, ApiError> {
    let emergencies = state.emergencies.list().await?;
    let recent = state.emergencies.recent(RECENT_FETCH_LIMIT).await?;
    let users = state.users.list().await?;
    Ok(views::build_dashboard(&emergencies, &recent, &users, now))
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardView>, ApiError> {
    Ok(Json(load_dashboard(&state, Utc::now()).await?))
}
