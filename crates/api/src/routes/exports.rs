//! CSV and PDF report downloads.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use domain::services::views::{index_users, sort_newest_first};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_export;
use crate::services::exports::reports::{self, ExportKind};
use crate::services::exports::{timestamped_filename, ExportFormat};

/// GET /api/v1/export/:kind/:format
///
/// CSV covers users, emergencies and alerts; PDF additionally offers the
/// complete system report.
pub async fn export(
    State(state): State<AppState>,
    Path((kind, format)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (kind, format) = match (ExportKind::parse(&kind), ExportFormat::parse(&format)) {
        (Some(ExportKind::Complete), Some(ExportFormat::Csv)) | (None, _) | (_, None) => {
            return Err(ApiError::NotFound(format!(
                "No {} export available as {}",
                kind, format
            )));
        }
        (Some(kind), Some(format)) => (kind, format),
    };
    let now = Utc::now();

    let body: Vec<u8> = match kind {
        ExportKind::Users => {
            let mut users = state.users.list().await?;
            sort_newest_first(&mut users, |u| u.created_at);
            match format {
                ExportFormat::Csv => reports::users_csv(&users).into_bytes(),
                ExportFormat::Pdf => reports::users_pdf(&users, now)?,
            }
        }
        ExportKind::Emergencies => {
            let mut emergencies = state.emergencies.list().await?;
            sort_newest_first(&mut emergencies, |e| e.created_at);
            let users = index_users(&state.users.list().await?);
            match format {
                ExportFormat::Csv => reports::emergencies_csv(&emergencies, &users).into_bytes(),
                ExportFormat::Pdf => reports::emergencies_pdf(&emergencies, &users, now)?,
            }
        }
        ExportKind::Alerts => {
            let mut alerts = state.alerts.list().await?;
            sort_newest_first(&mut alerts, |a| a.date_created);
            match format {
                ExportFormat::Csv => reports::alerts_csv(&alerts).into_bytes(),
                ExportFormat::Pdf => reports::alerts_pdf(&alerts, now)?,
            }
        }
        ExportKind::Complete => {
            let users = state.users.list().await?;
            let emergencies = state.emergencies.list().await?;
            let alerts = state.alerts.list().await?;
            reports::complete_pdf(&users, &emergencies, &alerts, now)?
        }
    };

    let filename = timestamped_filename(kind.file_prefix(), format, now);
    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", filename))
        .map_err(|e| ApiError::Internal(format!("Invalid export filename: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    record_export(kind.as_str(), format.extension());
    info!(kind = kind.as_str(), format = format.extension(), bytes = body.len(), "Export generated");

    Ok((headers, body).into_response())
}
