//! RetailCRM API Module
//!
//! | 路径 | 方法 | 权限 |
//! |------|------|------|
//! | /api/retailcrm/status | GET | crm_sync |
//! | /api/retailcrm/sync | POST | crm_sync |
//! | /api/retailcrm/orders | GET | view |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{permissions, require_permission};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/retailcrm", routes())
}

fn routes() -> Router<ServerState> {
    let sync_routes = Router::new()
        .route("/status", get(handler::status))
        .route("/sync", post(handler::sync))
        .layer(middleware::from_fn(require_permission(permissions::CRM_SYNC)));

    let view_routes = Router::new()
        .route("/orders", get(handler::orders))
        .layer(middleware::from_fn(require_permission(permissions::VIEW)));

    sync_routes.merge(view_routes)
}
