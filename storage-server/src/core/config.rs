use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{DEFAULT_ADMIN_PASSWORD, DEFAULT_USER_PASSWORD, JwtConfig, JwtError};
use crate::crm::{MappingRules, ReconcilerSettings};
use crate::records::{DEFAULT_MAX_PUSH_ATTEMPTS, StatusMapping};

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 8001 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (设置后按天滚动写文件) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | ADMIN_INITIAL_PASSWORD | admin | 初始管理员密码 |
/// | USER_INITIAL_PASSWORD | user | 初始员工密码 |
///
/// JWT 与 RetailCRM 配置见 [`JwtConfig::from_env`] 与 [`CrmConfig::from_env`]。
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/tires HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
    pub admin_initial_password: String,
    pub user_initial_password: String,
    /// RetailCRM 集成
    pub crm: CrmConfig,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值。生产环境缺少 `JWT_SECRET` 时返回错误。
    pub fn from_env() -> Result<Self, JwtError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let jwt = JwtConfig::from_env(environment == "production")?;

        Ok(Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_parse("HTTP_PORT", 8001),
            jwt,
            environment,
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30000),
            shutdown_timeout_ms: env_parse("SHUTDOWN_TIMEOUT_MS", 10000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            log_json: env_parse("LOG_JSON", false),
            admin_initial_password: std::env::var("ADMIN_INITIAL_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.into()),
            user_initial_password: std::env::var("USER_INITIAL_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_USER_PASSWORD.into()),
            crm: CrmConfig::from_env(),
        })
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景，不读取环境变量
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port,
            jwt: JwtConfig::default(),
            environment: "development".into(),
            request_timeout_ms: 30000,
            shutdown_timeout_ms: 10000,
            log_level: "info".into(),
            log_dir: None,
            log_json: false,
            admin_initial_password: DEFAULT_ADMIN_PASSWORD.into(),
            user_initial_password: DEFAULT_USER_PASSWORD.into(),
            crm: CrmConfig::default(),
        }
    }

    /// 数据库文件: work_dir/database/storage.redb
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
            .join("database")
            .join("storage.redb")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        if let Some(dir) = self.database_path().parent() {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// RetailCRM 集成配置
///
/// | 环境变量 | 默认值 |
/// |----------|--------|
/// | RETAILCRM_URL | - (未设置则关闭同步) |
/// | RETAILCRM_API_KEY | - |
/// | RETAILCRM_SITE | - |
/// | CRM_SYNC_INTERVAL_SECS | 3600 |
/// | CRM_PAGE_LIMIT | 100 |
/// | CRM_MAX_PAGES | 10 |
/// | CRM_TIMEOUT_SECS | 30 |
/// | CRM_ALLOWED_STATUSES | in-stock,client-confirmed |
/// | CRM_STORAGE_FLAG_FIELD | tire_storage |
/// | CRM_LOCATION_FIELD | storage_location |
/// | CRM_VEHICLE_FIELD | car_type |
/// | CRM_STORED_STATUS | на хранении |
/// | CRM_RELEASED_STATUS | выдан клиенту |
/// | CRM_PUSH_MAX_ATTEMPTS | 3 |
#[derive(Clone)]
pub struct CrmConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub site: Option<String>,
    pub sync_interval_secs: u64,
    pub page_limit: u32,
    pub max_pages: u32,
    pub timeout_secs: u64,
    pub allowed_statuses: Vec<String>,
    /// Empty disables the flag filter
    pub storage_flag_field: String,
    pub location_field: String,
    pub vehicle_field: String,
    pub stored_status: String,
    pub released_status: String,
    pub push_max_attempts: u32,
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("site", &self.site)
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("allowed_statuses", &self.allowed_statuses)
            .field("push_max_attempts", &self.push_max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        let rules = MappingRules::default();
        let mapping = StatusMapping::default();
        Self {
            url: None,
            api_key: None,
            site: None,
            sync_interval_secs: 3600,
            page_limit: 100,
            max_pages: 10,
            timeout_secs: 30,
            allowed_statuses: rules.allowed_statuses,
            storage_flag_field: "tire_storage".into(),
            location_field: rules.location_field,
            vehicle_field: rules.vehicle_field,
            stored_status: mapping.stored,
            released_status: mapping.released,
            push_max_attempts: DEFAULT_MAX_PUSH_ATTEMPTS,
        }
    }
}

impl CrmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_opt("RETAILCRM_URL"),
            api_key: env_opt("RETAILCRM_API_KEY"),
            site: env_opt("RETAILCRM_SITE"),
            sync_interval_secs: env_parse("CRM_SYNC_INTERVAL_SECS", defaults.sync_interval_secs),
            page_limit: env_parse("CRM_PAGE_LIMIT", defaults.page_limit),
            max_pages: env_parse("CRM_MAX_PAGES", defaults.max_pages),
            timeout_secs: env_parse("CRM_TIMEOUT_SECS", defaults.timeout_secs),
            allowed_statuses: std::env::var("CRM_ALLOWED_STATUSES")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.allowed_statuses),
            storage_flag_field: std::env::var("CRM_STORAGE_FLAG_FIELD")
                .unwrap_or(defaults.storage_flag_field),
            location_field: std::env::var("CRM_LOCATION_FIELD").unwrap_or(defaults.location_field),
            vehicle_field: std::env::var("CRM_VEHICLE_FIELD").unwrap_or(defaults.vehicle_field),
            stored_status: std::env::var("CRM_STORED_STATUS").unwrap_or(defaults.stored_status),
            released_status: std::env::var("CRM_RELEASED_STATUS")
                .unwrap_or(defaults.released_status),
            push_max_attempts: env_parse("CRM_PUSH_MAX_ATTEMPTS", defaults.push_max_attempts),
        }
    }

    /// URL 和 API key 都已配置
    pub fn is_enabled(&self) -> bool {
        self.url.is_some() && self.api_key.is_some()
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Intake statuses are the import allow-list
    pub fn status_mapping(&self) -> StatusMapping {
        StatusMapping {
            intake: self.allowed_statuses.clone(),
            stored: self.stored_status.clone(),
            released: self.released_status.clone(),
        }
    }

    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            page_limit: self.page_limit.max(1),
            max_pages: self.max_pages.max(1),
            flag_field: Some(self.storage_flag_field.clone()).filter(|f| !f.is_empty()),
            rules: MappingRules {
                allowed_statuses: self.allowed_statuses.clone(),
                location_field: self.location_field.clone(),
                vehicle_field: self.vehicle_field.clone(),
            },
            api_url: self.url.clone(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self::with_overrides("./data", 8001)
    }
}
