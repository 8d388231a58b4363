//! 请求日志中间件
//!
//! 每个请求完成时记录一条日志：请求 ID、方法、路由、用户、状态码和耗时。
//! `/health` 探活请求只在 debug 级别记录。

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::auth::CurrentUser;

const HEALTH_PATH: &str = "/health";

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let method = req.method().clone();
    // 用路由模板 (`/api/storage-records/{id}`) 而不是实际路径，便于聚合
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .map(|u| u.username.clone())
        .unwrap_or_default();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::error!(%request_id, %method, %route, %user, status, latency_ms, "Request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(%request_id, %method, %route, %user, status, latency_ms, "Request rejected");
    } else if route == HEALTH_PATH {
        tracing::debug!(%request_id, status, latency_ms, "Health check");
    } else {
        tracing::info!(%request_id, %method, %route, %user, status, latency_ms, "Request completed");
    }

    response
}
