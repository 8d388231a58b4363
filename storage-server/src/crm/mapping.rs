//! CRM order → record projection
//!
//! Filtering decides which orders become records; mapping turns an
//! accepted order into [`RecordFields`]. Every extractor falls back to
//! [`NOT_SPECIFIED`], so a sparse order still yields a complete record.

use shared::models::{ExternalRef, RecordFields};

use super::types::CrmOrder;

/// Placeholder for values the CRM did not provide
pub const NOT_SPECIFIED: &str = "Не указано";

/// Extra field carrying the CRM order number
pub const ORDER_NUMBER_FIELD: &str = "retailcrm_order_number";

/// Which orders are accepted and where custom values live
#[derive(Debug, Clone)]
pub struct MappingRules {
    pub allowed_statuses: Vec<String>,
    pub location_field: String,
    pub vehicle_field: String,
}

impl Default for MappingRules {
    fn default() -> Self {
        Self {
            allowed_statuses: vec!["in-stock".into(), "client-confirmed".into()],
            location_field: "storage_location".into(),
            vehicle_field: "car_type".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    StatusNotAllowed(String),
    NotPaid,
}

/// An order ready to be inserted
#[derive(Debug, Clone)]
pub struct MappedOrder {
    pub external: ExternalRef,
    pub fields: RecordFields,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("order has no id")]
    MissingId,
}

impl MappingRules {
    /// Status in the allow-list AND at least one paid payment
    pub fn accepts(&self, order: &CrmOrder) -> Result<(), Rejection> {
        let status = order.status.as_deref().unwrap_or_default();
        if !self.allowed_statuses.iter().any(|s| s == status) {
            return Err(Rejection::StatusNotAllowed(status.to_string()));
        }
        if !order.has_paid_payment() {
            return Err(Rejection::NotPaid);
        }
        Ok(())
    }

    pub fn map(&self, order: &CrmOrder) -> Result<MappedOrder, MappingError> {
        let external_id = order
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(MappingError::MissingId)?;
        let order_number = order
            .number
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| external_id.to_string());

        let mut fields = RecordFields::new();
        fields.insert("full_name", full_name(order));
        fields.insert("phone", phone(order));
        fields.insert("parameters", parameters(order));
        fields.insert("size", size(order));
        fields.insert(
            "storage_location",
            order
                .custom_field(&self.location_field)
                .unwrap_or_else(|| NOT_SPECIFIED.into()),
        );
        fields.insert(
            "car_brand",
            order
                .custom_field(&self.vehicle_field)
                .unwrap_or_else(|| NOT_SPECIFIED.into()),
        );
        fields.insert(ORDER_NUMBER_FIELD, order_number.clone());

        let status = order.status.clone().unwrap_or_default();
        Ok(MappedOrder {
            external: ExternalRef::new(external_id, order_number, status),
            fields,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn full_name(order: &CrmOrder) -> String {
    let first = order.first_name.as_deref().unwrap_or_default();
    let last = order.last_name.as_deref().unwrap_or_default();
    let name = format!("{} {}", first.trim(), last.trim());
    match name.trim() {
        "" => NOT_SPECIFIED.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn phone(order: &CrmOrder) -> String {
    non_empty(order.phone.as_deref())
        .or_else(|| {
            order
                .customer
                .as_ref()
                .and_then(|c| c.phones.iter().find_map(|p| non_empty(p.number.as_deref())))
        })
        .unwrap_or(NOT_SPECIFIED)
        .to_string()
}

fn parameters(order: &CrmOrder) -> String {
    let names: Vec<&str> = order
        .items
        .iter()
        .filter_map(|item| {
            non_empty(item.offer.as_ref().and_then(|o| o.name.as_deref()))
                .or_else(|| non_empty(item.product_name.as_deref()))
        })
        .collect();
    if names.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        names.join(", ")
    }
}

fn size(order: &CrmOrder) -> String {
    let quantities: Vec<f64> = order.items.iter().filter_map(|i| i.quantity).collect();
    if quantities.is_empty() {
        return NOT_SPECIFIED.to_string();
    }
    let total: f64 = quantities.iter().sum();
    format!("{} шт.", format_quantity(total))
}

/// `2.0` → `"2"`, `2.5` → `"2.5"`
fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
