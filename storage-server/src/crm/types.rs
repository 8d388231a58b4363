//! RetailCRM API v5 payloads
//!
//! Pages carry orders as raw JSON; each order is decoded on its own so one
//! malformed order cannot fail the page. [`CrmOrder`] tolerates the shapes
//! RetailCRM is known to send: numeric ids, float or string quantities,
//! `null` item lists, and `customFields`/`payments` as an object or `[]`.
//! Any other type mismatch fails that order only.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `GET /api/v5/orders` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrdersResponse {
    pub success: bool,
    #[serde(rename = "errorMsg")]
    pub error_msg: Option<String>,
    pub pagination: Option<Pagination>,
    pub orders: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub limit: u32,
    pub total_count: u32,
    pub current_page: u32,
    pub total_page_count: u32,
}

/// Generic `{ success, errorMsg }` envelope (edit endpoint)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiAck {
    pub success: bool,
    #[serde(rename = "errorMsg")]
    pub error_msg: Option<String>,
}

/// One page of orders
#[derive(Debug, Clone, Default)]
pub struct OrdersPage {
    /// Undecoded orders, see [`CrmOrder::from_value`]
    pub orders: Vec<Value>,
    /// Total pages reported by the CRM (at least 1)
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrmOrder {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub number: Option<String>,
    pub status: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub customer: Option<CrmCustomer>,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<CrmItem>,
    /// Object keyed by payment id, or an array
    pub payments: Value,
    /// Object keyed by field code, or `[]` when empty
    pub custom_fields: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrmCustomer {
    pub phones: Vec<CrmPhone>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrmPhone {
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrmItem {
    pub offer: Option<CrmOffer>,
    pub product_name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrmOffer {
    pub name: Option<String>,
}

impl CrmOrder {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Payment statuses, whatever shape `payments` has
    pub fn payment_statuses(&self) -> Vec<&str> {
        let entries: Vec<&Value> = match &self.payments {
            Value::Object(map) => map.values().collect(),
            Value::Array(items) => items.iter().collect(),
            _ => return Vec::new(),
        };
        entries
            .into_iter()
            .filter_map(|p| p.get("status").and_then(Value::as_str))
            .collect()
    }

    pub fn has_paid_payment(&self) -> bool {
        self.payment_statuses().contains(&"paid")
    }

    /// Custom field value as text; empty values count as absent
    pub fn custom_field(&self, code: &str) -> Option<String> {
        let value = self.custom_fields.as_object()?.get(code)?;
        let text = value_to_string(value)?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// String or number → `Option<String>`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

/// `null` → `T::default()`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Number or numeric string → `Option<f64>`
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
