//! User API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::{UserCreate, UserResponse, UserUpdate};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::security_log;

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<UserResponse>>> {
    Ok(Json(state.auth.list_users()?))
}

pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<UserResponse>> {
    let created = state.auth.create_user(payload)?;
    security_log!(
        "INFO",
        "user_created",
        username = created.username.clone(),
        actor = user.username.clone()
    );
    Ok(Json(created))
}

/// Update password, role or permissions
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(username): Path<String>,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    let updated = state.auth.update_user(&username, payload)?;
    security_log!(
        "INFO",
        "user_updated",
        username = username,
        actor = user.username.clone(),
        permissions = updated.permissions.join(",")
    );
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.auth.delete_user(&username, &user.username)?;
    Ok(Json(ApiResponse::ok()))
}
