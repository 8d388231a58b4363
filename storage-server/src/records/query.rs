//! In-memory record filtering for list and search endpoints

use shared::models::{RecordQuery, RecordStatus, StorageRecord};

/// Does `record` match the free-text needle?
///
/// Matches the record number exactly (with or without a leading `#`),
/// the client name case-insensitively, or the phone by digits.
pub fn matches_text(record: &StorageRecord, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return true;
    }

    let number = needle.trim_start_matches('#');
    if number.parse::<u64>().ok() == Some(record.sequence_number) {
        return true;
    }

    let lowered = needle.to_lowercase();
    if record
        .fields
        .get_or_empty("full_name")
        .to_lowercase()
        .contains(&lowered)
    {
        return true;
    }

    let digits = only_digits(needle);
    !digits.is_empty()
        && ["phone", "phone_additional"]
            .iter()
            .any(|field| only_digits(record.fields.get_or_empty(field)).contains(&digits))
}

fn only_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Apply list filters, keeping the incoming order
pub fn filter_records(records: Vec<StorageRecord>, query: &RecordQuery) -> Vec<StorageRecord> {
    records
        .into_iter()
        .filter(|r| query.status.is_none_or(|s| r.status == s))
        .filter(|r| !query.external_only || r.is_external())
        .filter(|r| query.q.as_deref().is_none_or(|q| matches_text(r, q)))
        .collect()
}

/// Release desk search: in-storage records only
pub fn search_in_storage(records: Vec<StorageRecord>, needle: &str) -> Vec<StorageRecord> {
    filter_records(
        records,
        &RecordQuery {
            status: Some(RecordStatus::InStorage),
            q: Some(needle.to_string()),
            external_only: false,
        },
    )
}
