//! Record field validation against the form schema

use shared::models::{FormConfig, FormField, RecordFields};

use super::RecordError;
use crate::utils::validation::{char_len, field_max_len};

/// Check required fields and length limits
///
/// Required fields are checked in schema order, so the error names the
/// first missing one. Extra keys not in the schema are allowed.
pub fn validate_fields(schema: &FormConfig, fields: &RecordFields) -> Result<(), RecordError> {
    for field in schema.required_fields() {
        if fields.is_blank(&field.name) {
            return Err(RecordError::validation(&field.name, "is required"));
        }
    }

    for (name, value) in fields.iter() {
        let max = field_max_len(name);
        let len = char_len(value);
        if len > max {
            return Err(RecordError::validation(
                name,
                format!("is too long ({len} chars, max {max})"),
            ));
        }
    }

    for field in schema.fields.iter().filter(|f| f.options.is_some()) {
        check_option(field, fields)?;
    }
    Ok(())
}

/// Select fields only accept one of their options (or nothing when optional)
fn check_option(field: &FormField, fields: &RecordFields) -> Result<(), RecordError> {
    let (Some(options), Some(value)) = (&field.options, fields.get(&field.name)) else {
        return Ok(());
    };
    if value.trim().is_empty() || options.iter().any(|o| o == value) {
        return Ok(());
    }
    Err(RecordError::validation(
        &field.name,
        format!("'{value}' is not one of the allowed options"),
    ))
}

/// Trim surrounding whitespace from every value
pub fn normalize_fields(fields: RecordFields) -> RecordFields {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_fields() -> RecordFields {
        [
            ("full_name", "Иван Петров"),
            ("phone", "+79001234567"),
            ("car_brand", "Lada"),
            ("parameters", "Nokian Hakkapeliitta"),
            ("size", "4 шт."),
            ("storage_location", "Бекетова 3а.к15"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_complete_fields_pass() {
        assert!(validate_fields(&FormConfig::default(), &complete_fields()).is_ok());
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let mut fields = complete_fields();
        fields.insert("phone", "  ");
        let err = validate_fields(&FormConfig::default(), &fields).unwrap_err();
        assert!(matches!(err, RecordError::Validation { field, .. } if field == "phone"));
    }

    #[test]
    fn test_optional_field_may_be_absent() {
        let fields = complete_fields();
        assert!(fields.get("phone_additional").is_none());
        assert!(validate_fields(&FormConfig::default(), &fields).is_ok());
    }

    #[test]
    fn test_too_long_value_rejected() {
        let mut fields = complete_fields();
        fields.insert("full_name", "я".repeat(201));
        let err = validate_fields(&FormConfig::default(), &fields).unwrap_err();
        assert!(matches!(err, RecordError::Validation { field, .. } if field == "full_name"));
    }

    #[test]
    fn test_unknown_storage_location_rejected() {
        let mut fields = complete_fields();
        fields.insert("storage_location", "Луна");
        let err = validate_fields(&FormConfig::default(), &fields).unwrap_err();
        assert!(
            matches!(err, RecordError::Validation { field, .. } if field == "storage_location")
        );
    }

    #[test]
    fn test_normalize_trims() {
        let fields: RecordFields = [("full_name", "  Иван  ")].into_iter().collect();
        assert_eq!(normalize_fields(fields).get("full_name"), Some("Иван"));
    }
}
