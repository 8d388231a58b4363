//! RetailCRM API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{RecordQuery, RecordView, SyncReport, SyncStatus};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::records::query;

/// Scheduler and last poll status
///
/// Without CRM credentials the status is all defaults.
pub async fn status(State(state): State<ServerState>) -> Json<SyncStatus> {
    let status = state
        .reconciler()
        .map(|r| r.status())
        .unwrap_or_default();
    Json(status)
}

/// Manual poll; rejected while another poll is running
pub async fn sync(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<SyncReport>> {
    let reconciler = state
        .reconciler()
        .ok_or_else(|| AppError::new(ErrorCode::CrmNotConfigured))?;

    tracing::info!(actor = %user.username, "Manual CRM sync requested");
    let report = reconciler.poll().await?;
    Ok(Json(report))
}

/// Records mirrored from CRM orders, newest first
pub async fn orders(
    State(state): State<ServerState>,
    Query(filter): Query<RecordQuery>,
) -> AppResult<Json<Vec<RecordView>>> {
    let filter = RecordQuery {
        external_only: true,
        ..filter
    };
    let records = query::filter_records(state.store().list_records()?, &filter);
    let engine = state.engine();
    Ok(Json(records.into_iter().map(|r| engine.view(r)).collect()))
}
