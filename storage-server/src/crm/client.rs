//! RetailCRM HTTP client
//!
//! [`OrderApi`] is the seam between the reconciler/lifecycle engine and the
//! CRM. [`RetailCrmClient`] talks to the real API v5; tests plug in a
//! scripted implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::{CrmError, CrmResult};
use super::types::{ApiAck, OrdersPage, OrdersResponse};

/// Order listing filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    /// Only orders whose boolean custom field is set
    pub flag_field: Option<String>,
}

/// Third-party order API
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn list_orders(&self, query: &OrderQuery) -> CrmResult<OrdersPage>;

    /// Set the CRM status of an order identified by its number
    async fn set_order_status(&self, order_number: &str, status: &str) -> CrmResult<()>;
}

/// RetailCRM API v5 client
#[derive(Debug, Clone)]
pub struct RetailCrmClient {
    client: Client,
    base_url: String,
    api_key: String,
    site: Option<String>,
}

impl RetailCrmClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        site: Option<String>,
        timeout: Duration,
    ) -> CrmResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            site,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v5/{}", self.base_url, path)
    }

    /// Map non-2xx into [`CrmError::Http`], otherwise decode the body
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> CrmResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(CrmError::Http {
                status: status.as_u16(),
                body: truncate(&text, 500),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait]
impl OrderApi for RetailCrmClient {
    async fn list_orders(&self, query: &OrderQuery) -> CrmResult<OrdersPage> {
        let mut params: Vec<(String, String)> = vec![
            ("apiKey".into(), self.api_key.clone()),
            ("limit".into(), query.limit.to_string()),
            ("page".into(), query.page.to_string()),
        ];
        if let Some(flag) = &query.flag_field {
            params.push((format!("filter[customFields][{flag}]"), "1".into()));
        }
        if let Some(site) = &self.site {
            params.push(("site".into(), site.clone()));
        }

        tracing::debug!(page = query.page, limit = query.limit, "Fetching CRM orders");
        let response = self
            .client
            .get(self.url("orders"))
            .query(&params)
            .send()
            .await?;
        let body: OrdersResponse = Self::handle_response(response).await?;

        if !body.success {
            return Err(CrmError::Api(
                body.error_msg.unwrap_or_else(|| "unknown error".into()),
            ));
        }

        let total_pages = body
            .pagination
            .map(|p| p.total_page_count)
            .unwrap_or(1)
            .max(1);
        Ok(OrdersPage {
            orders: body.orders,
            total_pages,
        })
    }

    async fn set_order_status(&self, order_number: &str, status: &str) -> CrmResult<()> {
        let order = serde_json::json!({ "status": status }).to_string();
        let mut form: Vec<(&str, &str)> = vec![("by", "number"), ("order", order.as_str())];
        if let Some(site) = &self.site {
            form.push(("site", site.as_str()));
        }

        let response = self
            .client
            .post(self.url(&format!("orders/{order_number}/edit")))
            .query(&[("apiKey", self.api_key.as_str())])
            .form(&form)
            .send()
            .await?;
        let ack: ApiAck = Self::handle_response(response).await?;

        if !ack.success {
            return Err(CrmError::Api(
                ack.error_msg.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        tracing::info!(order_number = %order_number, status = %status, "CRM order status updated");
        Ok(())
    }
}
