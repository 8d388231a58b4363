//! 定时同步任务
//!
//! 注册为 `TaskKind::Periodic`。取消信号只在两次轮询之间检查，
//! 正在进行的批量写入不会被中断。

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::reconciler::{Reconciler, SyncError};

pub struct SyncWorker {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl SyncWorker {
    pub fn new(
        reconciler: Arc<Reconciler>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reconciler,
            interval,
            shutdown,
        }
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "CRM sync worker started");
        self.reconciler.set_scheduler_running(true);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("CRM sync worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.reconciler.poll().await {
                        Ok(_) => {}
                        Err(SyncError::AlreadyRunning) => {
                            tracing::debug!("Scheduled poll skipped: manual sync in progress");
                        }
                        // 已在 reconciler 中记录，下次 tick 重试
                        Err(e) => tracing::debug!(error = %e, "Scheduled poll failed"),
                    }
                }
            }
        }

        self.reconciler.set_scheduler_running(false);
        tracing::info!("CRM sync worker stopped");
    }
}
