//! User API Module

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::{permissions, require_permission};
use crate::core::ServerState;

/// User router (user_management only)
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/users", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{username}", put(handler::update).delete(handler::delete))
        .layer(middleware::from_fn(require_permission(permissions::USER_MANAGEMENT)))
}
