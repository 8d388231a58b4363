//! Local/CRM status reconciliation for display
//!
//! CRM status codes are first classified into [`ExternalStatus`] using the
//! configured [`StatusMapping`], then compared against the expected pairing:
//!
//! | Local | Expected CRM status |
//! |-------|---------------------|
//! | `New` | one of the intake statuses |
//! | `InStorage` | stored status |
//! | `Released` | released status |

use serde::Serialize;
use shared::models::{RecordStatus, StorageRecord};

/// Label shown when local and CRM status disagree
pub const MISMATCH_LABEL: &str = "Несоответствие статусов";

/// CRM status codes that correspond to local states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapping {
    /// Statuses an order may have when it is imported
    pub intake: Vec<String>,
    /// Pushed on `take_into_storage`
    pub stored: String,
    /// Pushed on `release`
    pub released: String,
}

impl Default for StatusMapping {
    fn default() -> Self {
        Self {
            intake: vec!["in-stock".to_string(), "client-confirmed".to_string()],
            stored: "на хранении".to_string(),
            released: "выдан клиенту".to_string(),
        }
    }
}

impl StatusMapping {
    pub fn classify(&self, external: &str) -> ExternalStatus {
        if external == self.stored {
            ExternalStatus::Stored
        } else if external == self.released {
            ExternalStatus::Released
        } else if self.intake.iter().any(|s| s == external) {
            ExternalStatus::Intake
        } else {
            ExternalStatus::Other(external.to_string())
        }
    }

    /// Status to push after a transition into `status`
    pub fn target_for(&self, status: RecordStatus) -> Option<&str> {
        match status {
            RecordStatus::New => None,
            RecordStatus::InStorage => Some(&self.stored),
            RecordStatus::Released => Some(&self.released),
        }
    }

    /// Label for a record, using its last known CRM status
    pub fn label_for(&self, record: &StorageRecord) -> DisplayLabel {
        let external = record
            .external_ref
            .as_ref()
            .map(|r| self.classify(&r.status));
        derive_status_label(record.status, external.as_ref())
    }
}

/// Classified CRM status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalStatus {
    Intake,
    Stored,
    Released,
    Other(String),
}

/// Expected CRM status for a local status
fn expected_external(local: RecordStatus) -> ExternalStatus {
    match local {
        RecordStatus::New => ExternalStatus::Intake,
        RecordStatus::InStorage => ExternalStatus::Stored,
        RecordStatus::Released => ExternalStatus::Released,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayLabel {
    Local { status: RecordStatus },
    Mismatch { local: RecordStatus },
}

impl DisplayLabel {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Local { status } => status.label(),
            Self::Mismatch { .. } => MISMATCH_LABEL,
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}

/// Derive the display label from local and (optional) CRM status
///
/// Records without a CRM link always show their local label.
pub fn derive_status_label(local: RecordStatus, external: Option<&ExternalStatus>) -> DisplayLabel {
    match external {
        None => DisplayLabel::Local { status: local },
        Some(ext) if *ext == expected_external(local) => DisplayLabel::Local { status: local },
        Some(_) => DisplayLabel::Mismatch { local },
    }
}
