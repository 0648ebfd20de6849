//! Azure DevOps REST access.
//!
//! - `client` - Authenticated client and per-call client factory
//! - `types` - REST payloads

pub mod client;
pub mod types;

pub use client::{user_agent, DevOpsClient, DevOpsClientFactory, API_VERSION, PRODUCT_NAME};
pub use types::*;
