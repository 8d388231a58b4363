//! Data models
//!
//! Shared between the storage server and API clients.

pub mod form;
pub mod record;
pub mod sync;
pub mod user;

// Re-exports
pub use form::*;
pub use record::*;
pub use sync::*;
pub use user::*;
