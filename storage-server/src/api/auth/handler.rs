//! Authentication Handlers

use axum::{Json, extract::State};
use shared::error::{AppError, AppResult};
use shared::models::{LoginRequest, LoginResponse, UserResponse};

use crate::auth::CurrentUser;
use crate::core::ServerState;

/// Login handler
///
/// Authenticates user credentials and returns a JWT token
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }
    let response = state
        .auth
        .authenticate(req.username.trim(), &req.password)
        .await?;
    Ok(Json(response))
}

/// Get current user info
///
/// Reads the account fresh so permission changes are visible before the
/// token expires.
pub async fn me(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let account = state.auth.get_user(&user.username)?;
    Ok(Json(account))
}
