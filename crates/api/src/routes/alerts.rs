//! Alerts page data: alerts with the people who responded.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::alerts_view::AlertsView;
use domain::services::views;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsQuery {
    /// `safe`, `danger` or `evacuating`.
    pub filter: Option<String>,
}

pub(crate) async fn load_alerts_view(
    state: &AppState,
    query: &AlertsQuery,
) -> Result<AlertsView, ApiError> {
    let alerts = state.alerts.list().await?;
    let users = state.users.list().await?;
    Ok(views::build_alerts_view(&alerts, &users, query.filter.as_deref()))
}

/// GET /api/v1/alerts?filter=
pub async fn get_alerts_view(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsView>, ApiError> {
    Ok(Json(load_alerts_view(&state, &query).await?))
}
