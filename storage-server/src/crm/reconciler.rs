//! CRM order reconciler
//!
//! One poll: fetch flagged orders page by page → decode each order →
//! refresh the CRM status of known records → filter → map → batch insert
//! (dedup by external id, one sequence reservation). Polls never overlap:
//! a second caller gets [`SyncError::AlreadyRunning`].

use parking_lot::RwLock;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{SyncReport, SyncStatus};
use shared::util::now_millis;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use super::client::{OrderApi, OrderQuery};
use super::error::CrmError;
use super::mapping::{MappingRules, Rejection};
use super::types::CrmOrder;
use crate::records::{LifecycleEngine, RecordError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Synchronization already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::AlreadyRunning => AppError::new(ErrorCode::SyncAlreadyRunning),
            SyncError::Crm(e) => e.into(),
            SyncError::Record(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub page_limit: u32,
    /// Upper bound on pages fetched per poll
    pub max_pages: u32,
    /// Custom field marking orders for tire storage
    pub flag_field: Option<String>,
    pub rules: MappingRules,
    /// Shown in the status endpoint
    pub api_url: Option<String>,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            page_limit: 100,
            max_pages: 10,
            flag_field: Some("tire_storage".into()),
            rules: MappingRules::default(),
            api_url: None,
        }
    }
}

/// Clears the in-progress flag when the poll ends, however it ends
struct PollGuard<'a>(&'a AtomicBool);

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Reconciler {
    engine: Arc<LifecycleEngine>,
    api: Arc<dyn OrderApi>,
    settings: ReconcilerSettings,
    in_progress: AtomicBool,
    scheduler_running: AtomicBool,
    last: RwLock<SyncStatus>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.settings)
            .field("in_progress", &self.in_progress)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        engine: Arc<LifecycleEngine>,
        api: Arc<dyn OrderApi>,
        settings: ReconcilerSettings,
    ) -> Self {
        let last = SyncStatus {
            api_url: settings.api_url.clone(),
            ..SyncStatus::default()
        };
        Self {
            engine,
            api,
            settings,
            in_progress: AtomicBool::new(false),
            scheduler_running: AtomicBool::new(false),
            last: RwLock::new(last),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    pub(crate) fn set_scheduler_running(&self, running: bool) {
        self.scheduler_running.store(running, Ordering::SeqCst);
    }

    pub fn status(&self) -> SyncStatus {
        let mut status = self.last.read().clone();
        status.sync_in_progress = self.is_running();
        status.scheduler_running = self.scheduler_running.load(Ordering::SeqCst);
        status
    }

    /// Run one reconciliation pass
    pub async fn poll(&self) -> Result<SyncReport, SyncError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("CRM poll skipped: already running");
            return Err(SyncError::AlreadyRunning);
        }
        let _guard = PollGuard(&self.in_progress);

        let result = self.run_poll().await;
        let mut last = self.last.write();
        match result {
            Ok((report, page_error)) => {
                last.last_sync_at = Some(now_millis());
                last.last_sync_orders = report.inserted;
                last.last_error = page_error.map(|e| e.to_string());
                Ok(report)
            }
            Err(e) => {
                last.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Returns the report and, for an incomplete fetch, the page error
    async fn run_poll(&self) -> Result<(SyncReport, Option<CrmError>), SyncError> {
        let fetched = self.fetch_orders().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to fetch CRM orders");
        })?;

        let mut report = SyncReport {
            fetched: fetched.orders.len(),
            incomplete: fetched.error.is_some(),
            ..SyncReport::default()
        };

        let mut orders = Vec::with_capacity(fetched.orders.len());
        for (index, value) in fetched.orders.into_iter().enumerate() {
            let raw_id = value.get("id").cloned().unwrap_or(Value::Null);
            match CrmOrder::from_value(value) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    tracing::warn!(index, order_id = %raw_id, error = %e, "Order skipped: malformed payload");
                    report.skipped += 1;
                }
            }
        }

        let statuses: Vec<(String, String)> = orders
            .iter()
            .filter_map(|o| Some((o.id.clone()?, o.status.clone()?)))
            .collect();
        report.refreshed = self.engine.refresh_external_statuses(&statuses)?;

        let rules = &self.settings.rules;
        let mut accepted = Vec::new();
        for order in &orders {
            let id = order.id.as_deref().unwrap_or("?");
            match rules.accepts(order) {
                Ok(()) => {}
                Err(Rejection::StatusNotAllowed(status)) => {
                    tracing::debug!(order_id = %id, status = %status, "Order skipped: status not allowed");
                    report.filtered_out += 1;
                    continue;
                }
                Err(Rejection::NotPaid) => {
                    tracing::debug!(order_id = %id, "Order skipped: not paid");
                    report.filtered_out += 1;
                    continue;
                }
            }
            match rules.map(order) {
                Ok(mapped) => accepted.push(mapped),
                Err(e) => {
                    tracing::warn!(order_number = ?order.number, error = %e, "Order skipped: mapping failed");
                    report.skipped += 1;
                }
            }
        }

        let batch = self.engine.create_from_external_batch(accepted)?;
        report.duplicates = batch.duplicates;
        report.inserted = batch.inserted.len();

        for record in &batch.inserted {
            tracing::debug!(
                record_id = %record.record_id,
                sequence_number = record.sequence_number,
                "Record created from CRM order"
            );
        }
        tracing::info!(
            fetched = report.fetched,
            filtered_out = report.filtered_out,
            duplicates = report.duplicates,
            skipped = report.skipped,
            inserted = report.inserted,
            refreshed = report.refreshed,
            incomplete = report.incomplete,
            "CRM poll completed"
        );
        Ok((report, fetched.error))
    }

    /// Fetch pages until the CRM's page count or `max_pages` is reached
    ///
    /// A failure on the first page fails the poll. A failure on a later
    /// page ends the fetch; the pages already read are still processed.
    async fn fetch_orders(&self) -> Result<Fetched, CrmError> {
        let mut fetched = Fetched::default();
        let mut page = 1;
        loop {
            let query = OrderQuery {
                page,
                limit: self.settings.page_limit,
                flag_field: self.settings.flag_field.clone(),
            };
            let result = match self.api.list_orders(&query).await {
                Ok(result) => result,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        page,
                        error = %e,
                        kept = fetched.orders.len(),
                        "CRM page fetch failed, processing earlier pages"
                    );
                    fetched.error = Some(e);
                    break;
                }
            };
            fetched.orders.extend(result.orders);

            if page >= result.total_pages {
                break;
            }
            if page >= self.settings.max_pages {
                tracing::warn!(
                    total_pages = result.total_pages,
                    max_pages = self.settings.max_pages,
                    "CRM page limit reached, remaining orders deferred"
                );
                break;
            }
            page += 1;
        }
        Ok(fetched)
    }
}

/// Raw orders from one fetch
#[derive(Debug, Default)]
struct Fetched {
    orders: Vec<Value>,
    /// Set when a page after the first failed
    error: Option<CrmError>,
}
