//! 工具模块
//!
//! - [`logger`] - 日志初始化
//! - [`validation`] - 文本长度校验

pub mod logger;
pub mod validation;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
