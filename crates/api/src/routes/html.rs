//! Server-rendered versions of the dashboard, reports and alerts pages.

use axum::{
    extract::{Query, State},
    response::Html,
};
use chrono::Utc;

use super::alerts::{load_alerts_view, AlertsQuery};
use super::dashboard::load_dashboard;
use super::reports::{load_report, ReportQuery};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;
use crate::services::pages;

fn admin_name(session: &CurrentSession) -> String {
    session
        .0
        .auth
        .principal()
        .map(|p| {
            if p.username.is_empty() {
                p.email.clone()
            } else {
                p.username.clone()
            }
        })
        .unwrap_or_else(|| "Admin".to_string())
}

/// GET /admin/dashboard
pub async fn dashboard_page(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Html<String>, ApiError> {
    let view = load_dashboard(&state, Utc::now()).await?;
    Ok(Html(pages::render_dashboard(&view, &admin_name(&session))))
}

/// GET /admin/reports
pub async fn reports_page(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<ReportQuery>,
) -> Result<Html<String>, ApiError> {
    let view = load_report(&state, query, Utc::now()).await?;
    Ok(Html(pages::render_reports(&view, &admin_name(&session))))
}

/// GET /admin/alerts
pub async fn alerts_page(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<AlertsQuery>,
) -> Result<Html<String>, ApiError> {
    let view = load_alerts_view(&state, &query).await?;
    Ok(Html(pages::render_alerts(&view, &admin_name(&session))))
}
