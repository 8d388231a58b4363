//! Settings API Handlers

use std::collections::HashSet;

use axum::{Json, extract::State};
use shared::error::{AppError, AppResult};
use shared::models::{FormConfig, FormFieldType, ReceiptTemplate};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, MAX_TEMPLATE_LEN, validate_required_text,
};

pub async fn get_form_config(State(state): State<ServerState>) -> AppResult<Json<FormConfig>> {
    Ok(Json(state.store().form_config()?))
}

pub async fn update_form_config(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(config): Json<FormConfig>,
) -> AppResult<Json<FormConfig>> {
    validate_schema(&config)?;
    state.store().set_form_config(&config)?;
    tracing::info!(
        fields = config.fields.len(),
        actor = %user.username,
        "Form config updated"
    );
    Ok(Json(config))
}

pub async fn get_receipt_template(
    State(state): State<ServerState>,
) -> AppResult<Json<ReceiptTemplate>> {
    Ok(Json(state.store().receipt_template()?))
}

pub async fn update_receipt_template(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(template): Json<ReceiptTemplate>,
) -> AppResult<Json<ReceiptTemplate>> {
    validate_required_text(&template.template, "template", MAX_TEMPLATE_LEN)?;
    state.store().set_receipt_template(&template)?;
    tracing::info!(actor = %user.username, "Receipt template updated");
    Ok(Json(template))
}

/// Field names unique and non-empty; select fields carry at least one option
fn validate_schema(config: &FormConfig) -> AppResult<()> {
    if config.fields.is_empty() {
        return Err(AppError::invalid_field("fields", "Form must have at least one field"));
    }

    let mut seen = HashSet::new();
    for field in &config.fields {
        validate_required_text(&field.name, "name", MAX_SHORT_TEXT_LEN)?;
        validate_required_text(&field.label, "label", MAX_NAME_LEN)?;
        if !seen.insert(field.name.as_str()) {
            return Err(AppError::invalid_field(
                "name",
                format!("Duplicate field name: {}", field.name),
            ));
        }

        let options_empty = field.options.as_ref().is_none_or(|o| o.is_empty());
        if field.field_type == FormFieldType::Select && options_empty {
            return Err(AppError::invalid_field(
                field.name.clone(),
                "Select field needs at least one option",
            ));
        }
        for option in field.options.iter().flatten() {
            validate_required_text(option, "options", MAX_SHORT_TEXT_LEN)?;
        }
    }
    Ok(())
}
