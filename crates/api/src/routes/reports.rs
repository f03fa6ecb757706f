//! Reports page data.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::report::{ReportFilter, ReportView};
use domain::services::views;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub barangay: Option<String>,
    pub municipality: Option<String>,
}

impl ReportQuery {
    fn into_filter(self, default_municipality: &str) -> ReportFilter {
        ReportFilter {
            barangay: self.barangay.filter(|b| !b.trim().is_empty()),
            municipality: self
                .municipality
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_municipality.to_string()),
        }
    }
}

pub(crate) async fn load_report(
    state: &AppState,
    query: ReportQuery,
    now: DateTime<Utc>,
) -> Result<ReportView, ApiError> {
    let emergencies = state.emergencies.list().await?;
    let users = state.users.list().await?;
    let alert_count = state.alerts.count().await?;
    let reports = &state.config.reports;

    Ok(views::build_report(
        &emergencies,
        &users,
        alert_count,
        &reports.barangays,
        query.into_filter(&reports.municipality),
        now,
    ))
}

/// GET /api/v1/reports?barangay=&municipality=
pub async fn get_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportView>, ApiError> {
    Ok(Json(load_report(&state, query, Utc::now()).await?))
}
