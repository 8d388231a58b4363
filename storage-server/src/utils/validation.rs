//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Lengths are counted in characters: most input is Cyrillic.

use shared::error::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Names: client full name, car brand, usernames
pub const MAX_NAME_LEN: usize = 200;

/// Short identifiers: phone, size, storage location
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Free text: tire parameters, notes, custom fields
pub const MAX_NOTE_LEN: usize = 500;

/// Passwords (before hashing)
pub const MAX_PASSWORD_LEN: usize = 128;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Receipt template body
pub const MAX_TEMPLATE_LEN: usize = 10_000;

/// Length limit for a record field by name
pub fn field_max_len(field: &str) -> usize {
    match field {
        "full_name" | "car_brand" => MAX_NAME_LEN,
        "phone" | "phone_additional" | "size" | "storage_location" => MAX_SHORT_TEXT_LEN,
        _ => MAX_NOTE_LEN,
    }
}

pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

// ── Validation helpers (CRUD handlers) ──────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_field(
            field,
            format!("{field} must not be empty"),
        ));
    }
    validate_text_len(value, field, max_len)
}

fn validate_text_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let len = char_len(value);
    if len > max_len {
        return Err(AppError::invalid_field(
            field,
            format!("{field} is too long ({len} chars, max {max_len})"),
        ));
    }
    Ok(())
}
