//! Common types module for the fleet order engine.
//!
//! This module defines the data types shared by every crate of the workspace:
//! the order record and its payloads, query parameters, change events, storage
//! keys and the configuration validation framework used by pluggable
//! implementations.

/// Change notification events.
pub mod events;
/// Order records, drafts, patches and statuses.
pub mod order;
/// Configurable engine behaviour.
pub mod policy;
/// Filter criteria, pagination state and result pages.
pub mod query;
/// Base trait for self-registering implementations.
pub mod registry;
/// Storage namespaces for the durable cache.
pub mod storage;
/// Utility helpers.
pub mod utils;
/// Configuration validation types.
pub mod validation;

pub use events::*;
pub use order::*;
pub use policy::*;
pub use query::*;
pub use registry::*;
pub use storage::*;
pub use utils::{now, truncate_id};
pub use validation::*;
