//! RetailCRM integration
//!
//! # 组件
//!
//! - [`OrderApi`] / [`RetailCrmClient`] - API v5 client
//! - [`MappingRules`] - order filter and field projection
//! - [`Reconciler`] - poll, filter, map, dedupe, insert
//! - [`SyncWorker`] - periodic poll driver

mod client;
mod error;
mod mapping;
mod mock;
mod reconciler;
mod types;
mod worker;

pub use client::{OrderApi, OrderQuery, RetailCrmClient};
pub use error::{CrmError, CrmResult};
pub use mapping::{
    MappedOrder, MappingError, MappingRules, NOT_SPECIFIED, ORDER_NUMBER_FIELD, Rejection,
};
pub use mock::MockOrderApi;
pub use reconciler::{Reconciler, ReconcilerSettings, SyncError};
pub use types::{CrmCustomer, CrmItem, CrmOffer, CrmOrder, CrmPhone, OrdersPage};
pub use worker::SyncWorker;
