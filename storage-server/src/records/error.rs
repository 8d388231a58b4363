//! Record lifecycle errors

use shared::error::{AppError, ErrorCode};
use shared::models::RecordStatus;
use thiserror::Error;

use crate::db::StorageError;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Record is {current}, expected {expected}")]
    InvalidTransition {
        current: RecordStatus,
        expected: RecordStatus,
    },

    #[error("External order already has status '{external_status}'")]
    ConflictWithExternalState { external_status: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record {0} is not linked to an external order")]
    NotExternal(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl RecordError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<StorageError> for RecordError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::RecordNotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Validation { field, message } => {
                AppError::invalid_field(field.clone(), format!("{}: {}", field, message))
            }
            RecordError::InvalidTransition { current, expected } => AppError::with_message(
                ErrorCode::InvalidTransition,
                format!("Record is {}, expected {}", current, expected),
            )
            .with_detail("current", current.as_str())
            .with_detail("expected", expected.as_str()),
            RecordError::ConflictWithExternalState { external_status } => AppError::with_message(
                ErrorCode::ExternalStateConflict,
                format!("External order already has status '{}'", external_status),
            )
            .with_detail("external_status", external_status),
            RecordError::NotFound(id) => AppError::record_not_found(id),
            RecordError::NotExternal(id) => {
                AppError::new(ErrorCode::RecordNotExternal).with_detail("record_id", id)
            }
            RecordError::Storage(e) => e.into(),
        }
    }
}
