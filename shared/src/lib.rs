//! Shared types for the tire storage service
//!
//! Record models, form schema, user DTOs and the unified error system,
//! used by the server and by API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
