//! Remote Resource Gateway for the school finance API.

pub mod api_types;
pub mod client;
pub mod error;
pub mod keys;
pub mod transport;
pub mod types;

pub use client::Gateway;
pub use error::ApiError;
pub use keys::{ListParams, QueryKey, ResourceKind};
