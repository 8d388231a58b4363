//! Storage Record Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 存储记录状态
///
/// `New → InStorage → Released`，`Released` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Imported from the CRM, not yet physically received
    New,
    InStorage,
    Released,
}

impl RecordStatus {
    /// Human-facing label
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "Новая",
            Self::InStorage => "Взята на хранение",
            Self::Released => "Выдана с хранения",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InStorage => "in_storage",
            Self::Released => "released",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named record fields (`full_name`, `phone`, `storage_location`, ...)
///
/// Keys follow the form schema, extra keys are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordFields(BTreeMap<String, String>);

impl RecordFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Value for display, empty string when absent
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// True when the field is missing or only whitespace
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).is_none_or(|v| v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RecordFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Link to the originating CRM order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    /// CRM order id (dedup key)
    pub external_id: String,
    /// CRM order number, used when pushing status back
    pub order_number: String,
    /// Last known CRM status code
    pub status: String,
    /// Push attempts made so far
    #[serde(default)]
    pub sync_attempts: u32,
    #[serde(default)]
    pub last_sync_error: Option<String>,
    #[serde(default)]
    pub last_synced_at: Option<i64>,
}

impl ExternalRef {
    pub fn new(
        external_id: impl Into<String>,
        order_number: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            order_number: order_number.into(),
            status: status.into(),
            sync_attempts: 0,
            last_sync_error: None,
            last_synced_at: None,
        }
    }
}

/// Storage record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub record_id: String,
    /// Human-facing record number
    pub sequence_number: u64,
    pub status: RecordStatus,
    pub fields: RecordFields,
    pub created_at: i64,
    pub created_by: String,
    #[serde(default)]
    pub stored_at: Option<i64>,
    #[serde(default)]
    pub stored_by: Option<String>,
    #[serde(default)]
    pub released_at: Option<i64>,
    #[serde(default)]
    pub released_by: Option<String>,
    #[serde(default)]
    pub external_ref: Option<ExternalRef>,
}

impl StorageRecord {
    pub fn is_external(&self) -> bool {
        self.external_ref.is_some()
    }
}

/// Record with its derived status label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: StorageRecord,
    pub status_label: String,
    /// Local and external status disagree
    pub status_mismatch: bool,
}

/// Create record payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordCreate {
    pub fields: RecordFields,
}

/// List filter (`GET /api/storage-records`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    #[serde(default)]
    pub status: Option<RecordStatus>,
    /// Free-text match on number, name and phone
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub external_only: bool,
}

/// Bulk delete payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    pub record_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteResponse {
    pub deleted_count: usize,
}

/// Result of a spreadsheet import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    /// `(row number, reason)` for rows that were skipped
    pub skipped: Vec<(usize, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialize() {
        assert_eq!(
            serde_json::to_string(&RecordStatus::InStorage).unwrap(),
            "\"in_storage\""
        );
        let status: RecordStatus = serde_json::from_str("\"released\"").unwrap();
        assert_eq!(status, RecordStatus::Released);
    }

    #[test]
    fn test_fields_are_transparent_map() {
        let fields: RecordFields = [("full_name", "Ivan Petrov"), ("size", "2 шт.")]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["full_name"], "Ivan Petrov");
        assert_eq!(json["size"], "2 шт.");
    }

    #[test]
    fn test_is_blank() {
        let mut fields = RecordFields::new();
        fields.insert("phone", "   ");
        fields.insert("full_name", "Anna");
        assert!(fields.is_blank("phone"));
        assert!(fields.is_blank("car_brand"));
        assert!(!fields.is_blank("full_name"));
    }

    #[test]
    fn test_record_deserialize_without_optional_fields() {
        let json = r#"{
            "record_id": "r1",
            "sequence_number": 7,
            "status": "new",
            "fields": {"full_name": "Anna"},
            "created_at": 1,
            "created_by": "retailcrm"
        }"#;
        let record: StorageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sequence_number, 7);
        assert!(record.external_ref.is_none());
        assert!(record.released_at.is_none());
    }

    #[test]
    fn test_record_view_flattens_record() {
        let record = StorageRecord {
            record_id: "r1".into(),
            sequence_number: 1,
            status: RecordStatus::InStorage,
            fields: RecordFields::new(),
            created_at: 0,
            created_by: "admin".into(),
            stored_at: None,
            stored_by: None,
            released_at: None,
            released_by: None,
            external_ref: None,
        };
        let view = RecordView {
            status_label: record.status.label().to_string(),
            status_mismatch: false,
            record,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["record_id"], "r1");
        assert_eq!(json["status_label"], "Взята на хранение");
    }
}
