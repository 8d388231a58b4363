//! Receipt document rendering

use shared::models::{ReceiptTemplate, StorageRecord};
use shared::util::format_millis;

/// Fill `{placeholder}`s from the record
///
/// `{record_number}`, `{record_id}` and `{created_at}` come from the record
/// itself; any other identifier is looked up in the fields (empty when
/// absent). Braces around anything that is not an identifier are kept.
pub fn render_receipt(template: &ReceiptTemplate, record: &StorageRecord) -> String {
    let text = template.template.as_str();
    let mut out = String::with_capacity(text.len() + 64);
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_identifier(&after[..end]) => {
                out.push_str(&placeholder_value(&after[..end], record));
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn placeholder_value(name: &str, record: &StorageRecord) -> String {
    match name {
        "record_number" => record.sequence_number.to_string(),
        "record_id" => record.record_id.clone(),
        "created_at" => format_millis(record.created_at),
        field => record.fields.get_or_empty(field).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::RecordStatus;

    fn record() -> StorageRecord {
        StorageRecord {
            record_id: "r-1".into(),
            sequence_number: 17,
            status: RecordStatus::InStorage,
            fields: [
                ("full_name", "Иван Петров"),
                ("phone", "+79001234567"),
                ("size", "4 шт."),
            ]
            .into_iter()
            .collect(),
            created_at: 1_704_067_200_000,
            created_by: "anna".into(),
            stored_at: None,
            stored_by: None,
            released_at: None,
            released_by: None,
            external_ref: None,
        }
    }

    #[test]
    fn test_fills_fields_and_record_values() {
        let template = ReceiptTemplate {
            template: "№{record_number} {full_name}, {phone}: {size} ({created_at})".into(),
        };
        assert_eq!(
            render_receipt(&template, &record()),
            "№17 Иван Петров, +79001234567: 4 шт. (01.01.2024 00:00)"
        );
    }

    #[test]
    fn test_missing_field_is_empty_and_non_identifiers_kept() {
        let template = ReceiptTemplate {
            template: "[{car_brand}] {not a field} {".into(),
        };
        assert_eq!(render_receipt(&template, &record()), "[] {not a field} {");
    }

    #[test]
    fn test_default_template_has_no_placeholders_left() {
        let rendered = render_receipt(&ReceiptTemplate::default(), &record());
        assert!(rendered.contains("Иван Петров"));
        assert!(rendered.contains("17"));
        assert!(!rendered.contains("{full_name}"));
        assert!(!rendered.contains("{record_number}"));
    }
}
