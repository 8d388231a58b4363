//! Form schema and receipt template
//!
//! | 路径 | 方法 | 权限 |
//! |------|------|------|
//! | /api/form-config | GET | 登录 |
//! | /api/form-config | PUT | form_management |
//! | /api/receipt-template | GET | 登录 |
//! | /api/receipt-template | PUT | pdf_management |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::{permissions, require_permission};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/api/form-config", get(handler::get_form_config))
        .route("/api/receipt-template", get(handler::get_receipt_template));

    let form_routes = Router::new()
        .route("/api/form-config", put(handler::update_form_config))
        .layer(middleware::from_fn(require_permission(permissions::FORM_MANAGEMENT)));

    let template_routes = Router::new()
        .route("/api/receipt-template", put(handler::update_receipt_template))
        .layer(middleware::from_fn(require_permission(permissions::PDF_MANAGEMENT)));

    read_routes.merge(form_routes).merge(template_routes)
}
