//! Storage Record API Module
//!
//! | 路径 | 方法 | 权限 |
//! |------|------|------|
//! | /api/storage-records | GET | view |
//! | /api/storage-records | POST | store |
//! | /api/storage-records/search | GET | release |
//! | /api/storage-records/export | GET | view |
//! | /api/storage-records/import | POST | store |
//! | /api/storage-records/bulk | DELETE | delete_records |
//! | /api/storage-records/{id} | GET | view |
//! | /api/storage-records/{id}/take | PUT | store |
//! | /api/storage-records/{id}/release | PUT | release |
//! | /api/storage-records/{id}/retry-sync | POST | crm_sync |
//! | /api/storage-records/{id}/receipt | GET | store |

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::{permissions, require_permission};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/storage-records", routes())
}

fn routes() -> Router<ServerState> {
    let view_routes = Router::new()
        .route("/", get(handler::list))
        .route("/export", get(handler::export))
        .route("/{id}", get(handler::get_by_id))
        .layer(middleware::from_fn(require_permission(permissions::VIEW)));

    let store_routes = Router::new()
        .route("/", post(handler::create))
        .route("/import", post(handler::import))
        .route("/{id}/take", put(handler::take))
        .route("/{id}/receipt", get(handler::receipt))
        .layer(middleware::from_fn(require_permission(permissions::STORE)));

    let release_routes = Router::new()
        .route("/search", get(handler::search))
        .route("/{id}/release", put(handler::release))
        .layer(middleware::from_fn(require_permission(permissions::RELEASE)));

    let delete_routes = Router::new()
        .route("/bulk", delete(handler::bulk_delete))
        .layer(middleware::from_fn(require_permission(permissions::DELETE_RECORDS)));

    let sync_routes = Router::new()
        .route("/{id}/retry-sync", post(handler::retry_sync))
        .layer(middleware::from_fn(require_permission(permissions::CRM_SYNC)));

    view_routes
        .merge(store_routes)
        .merge(release_routes)
        .merge(delete_routes)
        .merge(sync_routes)
}
