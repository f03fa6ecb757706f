//! User management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::user::{CreateUserRequest, UpdateUserRequest};
use domain::models::User;
use domain::services::views::sort_newest_first;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use super::ActionResponse;
use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: usize,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".into())
}

/// GET /api/v1/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, ApiError> {
    let mut users = state.users.list().await?;
    sort_newest_first(&mut users, |u| u.created_at);
    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.get(&user_id).await?.ok_or_else(user_not_found)?;
    Ok(Json(user))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    request.validate()?;

    if state
        .users
        .find_by_username(request.username.trim())
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username is already taken".into()));
    }

    let user = state.users.create(&request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/v1/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    request.validate()?;
    if request.is_empty() {
        return Err(ApiError::Validation("No fields to update".into()));
    }

    let user = state
        .users
        .update(&user_id, &request, Utc::now())
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let user = state
        .users
        .delete(&user_id)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = %user.id, "User removed by admin");
    Ok(Json(ActionResponse::ok("User deleted successfully")))
}
