//! Order lifecycle state and query engine.
//!
//! This crate owns the canonical order collection and everything derived from
//! it: status transitions, filtered and paginated views, summary metrics, and
//! the orchestration of backend round trips that keep the collection in sync
//! with the server. Changes are announced on an event bus and the collection
//! is saved to a durable cache after every successful write.

pub mod aggregate;
pub mod builder;
pub mod engine;
pub mod persistence;
pub mod query;
pub mod state;
pub mod store;

pub use aggregate::{counts_by_status, total_revenue, StatusCounts};
pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use engine::event_bus::EventBus;
pub use engine::request::{RequestTicket, RequestTracker};
pub use engine::{EngineError, EngineOptions, FetchOutcome, OrderEngine};
pub use persistence::{PersistedState, SnapshotPersistence, VersionedSnapshot};
pub use query::{filter_orders, paginate};
pub use store::{OrderStore, StoreCommand, StoreError, StoreSnapshot};
