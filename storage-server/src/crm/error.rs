//! RetailCRM client errors

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM integration is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    /// `success: false` in an otherwise valid response
    #[error("CRM rejected request: {0}")]
    Api(String),
}

pub type CrmResult<T> = Result<T, CrmError>;

impl From<reqwest::Error> for CrmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CrmError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<CrmError> for AppError {
    fn from(e: CrmError) -> Self {
        let code = match &e {
            CrmError::NotConfigured => ErrorCode::CrmNotConfigured,
            CrmError::Timeout => ErrorCode::TimeoutError,
            CrmError::Network(_) => ErrorCode::NetworkError,
            CrmError::Decode(_) => ErrorCode::CrmResponseInvalid,
            CrmError::Http { .. } | CrmError::Api(_) => ErrorCode::CrmRequestFailed,
        };
        AppError::with_message(code, e.to_string())
    }
}
