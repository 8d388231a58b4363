//! CRM synchronization DTOs

use serde::{Deserialize, Serialize};

/// Reconciler status snapshot (`GET /api/retailcrm/status`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Periodic worker is registered
    pub scheduler_running: bool,
    pub sync_in_progress: bool,
    pub api_url: Option<String>,
    pub last_sync_at: Option<i64>,
    /// Records inserted by the last completed poll
    pub last_sync_orders: usize,
    pub last_error: Option<String>,
}

/// Outcome of one poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub fetched: usize,
    /// Dropped by status / payment filter
    pub filtered_out: usize,
    /// Already known external ids
    pub duplicates: usize,
    /// Dropped because the payload was malformed or mapping failed
    pub skipped: usize,
    pub inserted: usize,
    /// Known records whose CRM status changed since the last poll
    #[serde(default)]
    pub refreshed: usize,
    /// A later page failed; orders from the pages before it were processed
    #[serde(default)]
    pub incomplete: bool,
}

/// Outcome of a status push to the CRM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PushOutcome {
    /// Record has no external order
    NotLinked,
    Pushed { status: String },
    Failed { attempt: u32, error: String },
    /// Attempt cap reached, nothing sent
    Exhausted { attempts: u32 },
}
