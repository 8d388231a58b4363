//! In-memory [`OrderApi`] for tests and offline runs
//!
//! Serves scripted order pages and records every status push.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use super::client::{OrderApi, OrderQuery};
use super::error::{CrmError, CrmResult};
use super::types::OrdersPage;

#[derive(Debug, Default)]
pub struct MockOrderApi {
    pages: Mutex<Vec<Vec<Value>>>,
    list_calls: AtomicUsize,
    pushes: Mutex<Vec<(String, String)>>,
    fail_listing: AtomicBool,
    /// Pages at or after this one fail; 0 disables
    fail_from_page: AtomicU32,
    fail_pushes: AtomicBool,
}

impl MockOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `orders` as a single page
    pub fn with_orders(orders: Vec<Value>) -> Self {
        let api = Self::new();
        api.set_pages(vec![orders]);
        api
    }

    pub fn set_pages(&self, pages: Vec<Vec<Value>>) {
        *self.pages.lock() = pages;
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_from_page(&self, page: u32) {
        self.fail_from_page.store(page, Ordering::SeqCst);
    }

    pub fn set_fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// `(order_number, status)` for every push attempt, failed ones included
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.pushes.lock().clone()
    }
}

#[async_trait]
impl OrderApi for MockOrderApi {
    async fn list_orders(&self, query: &OrderQuery) -> CrmResult<OrdersPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let fail_from = self.fail_from_page.load(Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) || (fail_from > 0 && query.page >= fail_from) {
            return Err(CrmError::Network("connection refused".into()));
        }

        let pages = self.pages.lock();
        let index = query.page.saturating_sub(1) as usize;
        Ok(OrdersPage {
            orders: pages.get(index).cloned().unwrap_or_default(),
            total_pages: (pages.len() as u32).max(1),
        })
    }

    async fn set_order_status(&self, order_number: &str, status: &str) -> CrmResult<()> {
        self.pushes
            .lock()
            .push((order_number.to_string(), status.to_string()));
        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(CrmError::Http {
                status: 503,
                body: "Service Unavailable".into(),
            });
        }
        Ok(())
    }
}
