//! 进程级错误
//!
//! 启动和运行 HTTP 服务时的错误。请求级错误统一使用 [`shared::error::AppError`]。

use thiserror::Error;

use crate::auth::JwtError;
use crate::crm::CrmError;
use crate::db::StorageError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(#[from] JwtError),

    #[error("工作目录不可用: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据库初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("CRM 客户端初始化失败: {0}")]
    Crm(#[from] CrmError),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
