//! Notification feed built from alert responses and responder assignments.

use axum::{extract::State, Json};
use domain::models::{Emergency, EmergencyAlert, Notification};
use domain::services::notification_feed::{
    self, RECENT_ALERT_LIMIT, RECENT_EMERGENCY_LIMIT,
};
use domain::services::views::index_users;
use serde::Serialize;
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub marked: usize,
}

async fn sources(state: &AppState) -> Result<(Vec<EmergencyAlert>, Vec<Emergency>), ApiError> {
    let alerts = state.alerts.recent(RECENT_ALERT_LIMIT).await?;
    let emergencies = state.emergencies.recent(RECENT_EMERGENCY_LIMIT).await?;
    Ok((alerts, emergencies))
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let (alerts, emergencies) = sources(&state).await?;
    let users = index_users(&state.users.list().await?);

    let notifications =
        notification_feed::build_feed(&alerts, &emergencies, &users, &session.read_notifications);
    let unread_count =
        notification_feed::unread_count(&alerts, &emergencies, &session.read_notifications);

    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

/// GET /api/v1/notifications/count
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let (alerts, emergencies) = sources(&state).await?;
    let count = notification_feed::unread_count(&alerts, &emergencies, &session.read_notifications);
    Ok(Json(UnreadCountResponse { count }))
}

/// POST /api/v1/notifications/mark-read
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let (alerts, emergencies) = sources(&state).await?;
    let marked = notification_feed::unread_count(&alerts, &emergencies, &session.read_notifications);

    notification_feed::mark_all_read(&alerts, &emergencies, &mut session.read_notifications);
    state.sessions.save(&session).await?;

    debug!(marked, "Notifications marked as read");
    Ok(Json(MarkReadResponse {
        success: true,
        marked,
    }))
}
