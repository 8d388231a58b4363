//! Storage Record API Handlers

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    BulkDeleteRequest, BulkDeleteResponse, ImportSummary, PushOutcome, RecordCreate, RecordQuery,
    RecordView,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::export::{export_csv, parse_import, render_receipt};
use crate::records::{RecordError, Transition, query};

/// Upper bound on ids per bulk delete
const MAX_BULK_DELETE: usize = 1000;

/// Multipart field carrying the CSV file
const IMPORT_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// A transition plus what happened to its CRM push
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub record: RecordView,
    pub push: PushOutcome,
}

fn transition_response(state: &ServerState, transition: Transition) -> TransitionResponse {
    TransitionResponse {
        record: state.engine().view(transition.record),
        push: transition.push,
    }
}

/// List records, newest first
pub async fn list(
    State(state): State<ServerState>,
    Query(filter): Query<RecordQuery>,
) -> AppResult<Json<Vec<RecordView>>> {
    let records = query::filter_records(state.store().list_records()?, &filter);
    let engine = state.engine();
    Ok(Json(records.into_iter().map(|r| engine.view(r)).collect()))
}

/// Walk-in intake
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<RecordCreate>,
) -> AppResult<Json<RecordView>> {
    let record = state.engine().create_direct(payload.fields, &user.username)?;
    Ok(Json(state.engine().view(record)))
}

/// Release desk lookup: in-storage records only
pub async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<RecordView>>> {
    let needle = params.q.trim();
    if needle.is_empty() {
        return Err(AppError::invalid_field("q", "Search query must not be empty"));
    }
    let records = query::search_in_storage(state.store().list_records()?, needle);
    let engine = state.engine();
    Ok(Json(records.into_iter().map(|r| engine.view(r)).collect()))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<RecordView>> {
    let record = state.engine().get(&id)?;
    Ok(Json(state.engine().view(record)))
}

/// `New → InStorage`
pub async fn take(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<TransitionResponse>> {
    let transition = state.engine().take_into_storage(&id, &user.username).await?;
    Ok(Json(transition_response(&state, transition)))
}

/// `InStorage → Released`
pub async fn release(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<TransitionResponse>> {
    let transition = state.engine().release(&id, &user.username).await?;
    Ok(Json(transition_response(&state, transition)))
}

/// Push the CRM status again after an earlier failure
pub async fn retry_sync(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<TransitionResponse>> {
    let transition = state.engine().retry_push(&id).await?;
    tracing::info!(record_id = %id, actor = %user.username, push = ?transition.push, "CRM push retried");
    Ok(Json(transition_response(&state, transition)))
}

/// Receipt document as plain text
pub async fn receipt(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state.engine().get(&id)?;
    let template = state.store().receipt_template()?;
    let body = render_receipt(&template, &record);
    let disposition = format!(
        "inline; filename=\"receipt_{}.txt\"",
        record.sequence_number
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub async fn bulk_delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResponse>> {
    if payload.record_ids.is_empty() {
        return Err(AppError::invalid_field("record_ids", "No records selected"));
    }
    if payload.record_ids.len() > MAX_BULK_DELETE {
        return Err(AppError::invalid_field(
            "record_ids",
            format!("At most {} records per request", MAX_BULK_DELETE),
        ));
    }

    let deleted_count = state.store().delete_records(&payload.record_ids)?;
    crate::security_log!(
        "INFO",
        "records_deleted",
        actor = user.username.clone(),
        requested = payload.record_ids.len(),
        deleted = deleted_count
    );
    Ok(Json(BulkDeleteResponse { deleted_count }))
}

/// CSV export of the filtered list
pub async fn export(
    State(state): State<ServerState>,
    Query(filter): Query<RecordQuery>,
) -> AppResult<impl IntoResponse> {
    let records = query::filter_records(state.store().list_records()?, &filter);
    let engine = state.engine();
    let views: Vec<RecordView> = records.into_iter().map(|r| engine.view(r)).collect();
    let body = export_csv(&views)?;

    let filename = format!(
        "storage_records_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

/// CSV import; every row goes through the same validation as a walk-in
pub async fn import(
    State(state): State<ServerState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ImportSummary>> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some(IMPORT_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::invalid_request(format!("Failed to read upload: {}", e)))?;
            data = Some(bytes);
            break;
        }
    }
    let data = data.ok_or_else(|| {
        AppError::with_message(ErrorCode::ImportFileInvalid, "Missing 'file' field")
    })?;

    let mut summary = ImportSummary::default();
    for row in parse_import(&data)? {
        let row = match row {
            Ok(row) => row,
            Err(skipped) => {
                summary.skipped.push(skipped);
                continue;
            }
        };
        match state.engine().create_direct(row.fields, &user.username) {
            Ok(_) => summary.imported += 1,
            Err(RecordError::Validation { field, message }) => {
                summary.skipped.push((row.row, format!("{}: {}", field, message)));
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped.len(),
        actor = %user.username,
        "Records imported"
    );
    Ok(Json(summary))
}
