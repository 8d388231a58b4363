//! Storage record domain
//!
//! - [`LifecycleEngine`] - creation and status transitions
//! - [`PushPolicy`] - bounded CRM status push
//! - [`derive_status_label`] - local/CRM status display reconciliation
//! - [`query`] - list filters and release-desk search

mod error;
mod lifecycle;
mod push;
pub mod query;
mod status_label;
mod validation;

pub use error::RecordError;
pub use lifecycle::{CRM_ACTOR, LifecycleEngine, Transition};
pub use push::{DEFAULT_MAX_PUSH_ATTEMPTS, PushPolicy};
pub use status_label::{
    DisplayLabel, ExternalStatus, MISMATCH_LABEL, StatusMapping, derive_status_label,
};
pub use validation::{normalize_fields, validate_fields};
