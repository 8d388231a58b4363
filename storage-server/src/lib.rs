//! Tire Storage Server - 轮胎寄存记录服务
//!
//! # 架构概述
//!
//! - **存储** (`db`): 嵌入式 redb，记录、序号、账户、设置
//! - **记录** (`records`): 状态机 `New → InStorage → Released`，CRM 状态推送
//! - **CRM** (`crm`): RetailCRM 订单拉取、过滤、映射、去重
//! - **认证** (`auth`): JWT + Argon2 认证体系，按操作授权
//! - **导出** (`export`): CSV 表格与回执文本
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! storage-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── auth/          # JWT 认证、权限、账户
//! ├── db/            # redb 存储层
//! ├── records/       # 记录生命周期
//! ├── crm/           # RetailCRM 同步
//! ├── export/        # CSV / 回执
//! ├── api/           # HTTP 路由和处理器
//! ├── routes/        # 中间件装配
//! └── utils/         # 日志、校验
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod crm;
pub mod db;
pub mod export;
pub mod records;
pub mod routes;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use db::RecordStore;
pub use records::LifecycleEngine;
pub use routes::build_app;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
  _____ _             ____  _
 |_   _(_)_ __ ___   / ___|| |_ ___  _ __ __ _  __ _  ___
   | | | | '__/ _ \  \___ \| __/ _ \| '__/ _` |/ _` |/ _ \
   | | | | | |  __/   ___) | || (_) | | | (_| | (_| |  __/
   |_| |_|_|  \___|  |____/ \__\___/|_|  \__,_|\__, |\___|
                                               |___/
    "#
    );
}
