//! Signed-in admin's own profile.

use axum::{extract::State, Json};
use chrono::Utc;
use domain::models::profile::{ProfileUpdate, ProfileUpdateRequest, ProfileView};
use domain::models::User;
use persistence::store::Fields;
use serde::Serialize;
use serde_json::json;
use shared::time::format_timestamp;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;

#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub success: bool,
    pub message: &'static str,
    pub profile: ProfileView,
}

async fn current_user(state: &AppState, session: &CurrentSession) -> Result<User, ApiError> {
    let principal = session.principal()?;
    state
        .users
        .get(&principal.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin profile not found".into()))
}

/// GET /api/v1/admin/profile
pub async fn get_profile(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<ProfileView>, ApiError> {
    let user = current_user(&state, &session).await?;
    let last_login = session.principal()?.last_login;
    Ok(Json(ProfileView::new(&user, Some(last_login))))
}

/// PUT /api/v1/admin/profile
///
/// The body's `type` selects personal, contact or account (password) fields.
pub async fn update_profile(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<ProfileUpdateResponse>, ApiError> {
    let update = ProfileUpdate::try_from(request)?;
    let user = current_user(&state, &session).await?;
    let now = Utc::now();
    let stamp = json!(format_timestamp(now));

    match &update {
        ProfileUpdate::Personal {
            full_name,
            department,
            address,
        } => {
            let mut fields = Fields::new();
            fields.insert("fullName".into(), json!(full_name));
            fields.insert("department".into(), json!(department));
            fields.insert("address".into(), json!(address));
            fields.insert("updatedAt".into(), stamp);
            state.users.patch(&user.id, fields).await?;
        }
        ProfileUpdate::Contact {
            email,
            phone,
            emergency_phone,
            emergency_name,
        } => {
            let mut fields = Fields::new();
            fields.insert("email".into(), json!(email));
            fields.insert("phone".into(), json!(phone));
            fields.insert("emergencyPhone".into(), json!(emergency_phone));
            fields.insert("emergencyName".into(), json!(emergency_name));
            fields.insert("updatedAt".into(), stamp);
            state.users.patch(&user.id, fields).await?;
            if *email != user.email {
                state.users.mirror_email(&user.id, email).await;
            }
        }
        ProfileUpdate::Account {
            current_password,
            new_password,
        } => {
            let changed = state
                .users
                .change_password(&user, current_password, new_password, now)
                .await?;
            if !changed {
                return Err(ApiError::Validation("Current password is incorrect".into()));
            }
        }
    }

    info!(user_id = %user.id, kind = update.kind(), "Admin profile updated");

    let refreshed = current_user(&state, &session).await?;
    let last_login = session.principal()?.last_login;
    Ok(Json(ProfileUpdateResponse {
        success: true,
        message: update.success_message(),
        profile: ProfileView::new(&refreshed, Some(last_login)),
    }))
}
