use std::sync::Arc;

use crate::auth::{AuthService, JwtService};
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::crm::{OrderApi, Reconciler, RetailCrmClient, SyncError, SyncWorker};
use crate::db::RecordStore;
use crate::records::{LifecycleEngine, PushPolicy};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | store | RecordStore | redb 存储 |
/// | engine | Arc<LifecycleEngine> | 记录生命周期 |
/// | reconciler | Option<Arc<Reconciler>> | CRM 同步 (未配置时为 None) |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | auth | AuthService | 登录与账户管理 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub store: RecordStore,
    pub engine: Arc<LifecycleEngine>,
    pub reconciler: Option<Arc<Reconciler>>,
    pub jwt_service: Arc<JwtService>,
    pub auth: AuthService,
}

impl ServerState {
    /// 组装服务
    ///
    /// `api` 为 None 时不做 CRM 同步，状态推送以 NotConfigured 失败。
    pub fn new(config: Config, store: RecordStore, api: Option<Arc<dyn OrderApi>>) -> Self {
        let engine = Arc::new(LifecycleEngine::new(
            store.clone(),
            api.clone(),
            PushPolicy::new(config.crm.push_max_attempts),
            config.crm.status_mapping(),
        ));
        let reconciler = api.map(|api| {
            Arc::new(Reconciler::new(
                engine.clone(),
                api,
                config.crm.reconciler_settings(),
            ))
        });
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let auth = AuthService::new(store.clone(), jwt_service.clone());

        Self {
            config,
            store,
            engine,
            reconciler,
            jwt_service,
            auth,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/storage.redb)
    /// 3. RetailCRM 客户端 (已配置时)
    /// 4. 默认账户
    pub fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;

        let db_path = config.database_path();
        let store = RecordStore::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database opened");

        let api: Option<Arc<dyn OrderApi>> = match (&config.crm.url, &config.crm.api_key) {
            (Some(url), Some(key)) => {
                let client = RetailCrmClient::new(
                    url.as_str(),
                    key.as_str(),
                    config.crm.site.clone(),
                    config.crm.timeout(),
                )?;
                tracing::info!(url = %client.base_url(), "RetailCRM integration enabled");
                Some(Arc::new(client) as Arc<dyn OrderApi>)
            }
            _ => {
                tracing::warn!("RETAILCRM_URL / RETAILCRM_API_KEY not set, CRM sync disabled");
                None
            }
        };

        let state = Self::new(config.clone(), store, api);
        state.auth.seed_default_users(
            &config.admin_initial_password,
            &config.user_initial_password,
        ).map_err(|e| anyhow::anyhow!("Failed to seed default users: {}", e))?;

        Ok(state)
    }

    /// 启动后台任务
    ///
    /// 已配置 CRM 时：启动后立即同步一次 (Warmup)，之后按间隔同步 (Periodic)。
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let Some(reconciler) = self.reconciler.clone() else {
            return;
        };

        let initial = reconciler.clone();
        tasks.spawn("crm_initial_sync", TaskKind::Warmup, async move {
            match initial.poll().await {
                Ok(report) => tracing::info!(inserted = report.inserted, "Initial CRM sync finished"),
                Err(SyncError::AlreadyRunning) => {}
                Err(e) => tracing::warn!(error = %e, "Initial CRM sync failed"),
            }
        });

        let worker = SyncWorker::new(
            reconciler,
            self.config.crm.sync_interval(),
            tasks.shutdown_token(),
        );
        tasks.spawn("crm_sync", TaskKind::Periodic, worker.run());
    }

    /// 获取 JWT 服务
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    /// CRM 同步器，未配置时返回 None
    pub fn reconciler(&self) -> Option<&Arc<Reconciler>> {
        self.reconciler.as_ref()
    }
}
