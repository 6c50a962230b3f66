//! Backend boundary for the fleet order engine.
//!
//! The engine talks to its backend through a four-operation contract
//! (`fetch_all`, `create`, `update`, `delete`). Implementations are pluggable
//! and selected by name from configuration, the same way storage backends are.

use async_trait::async_trait;
use fleet_types::{ConfigSchema, ImplementationRegistry, Order, OrderDraft, OrderPatch};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during backend round trips.
#[derive(Debug, Error)]
pub enum BackendError {
	/// Opaque transport failure. The message is kept verbatim.
	#[error("{0}")]
	Transport(String),
	/// The backend has no order with the given id.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// The backend refused the payload.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface every backend implementation provides.
///
/// `create` and `update` must answer with the full canonical order record,
/// including the id and timestamps the backend assigned.
#[async_trait]
pub trait BackendInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Lists every order, newest first.
	async fn fetch_all(&self) -> Result<Vec<Order>, BackendError>;

	/// Creates an order from a draft and returns the canonical record.
	async fn create(&self, draft: OrderDraft) -> Result<Order, BackendError>;

	/// Applies a partial patch and returns the canonical record.
	async fn update(&self, id: &str, patch: OrderPatch) -> Result<Order, BackendError>;

	/// Deletes an order.
	async fn delete(&self, id: &str) -> Result<(), BackendError>;
}

/// Signature of the function every backend implementation exposes to build
/// itself from its configuration table.
pub type BackendFactory = fn(&toml::Value) -> Result<Box<dyn BackendInterface>, BackendError>;

/// Registry trait for backend implementations.
pub trait BackendRegistry: ImplementationRegistry<Factory = BackendFactory> {}

/// Get all registered backend implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, BackendFactory)> {
	use implementations::memory;

	vec![(memory::Registry::NAME, memory::Registry::factory())]
}

/// Service routing backend calls to the primary implementation.
pub struct BackendService {
	implementations: HashMap<String, Arc<dyn BackendInterface>>,
	primary_implementation: String,
}

impl BackendService {
	/// Creates a new BackendService.
	///
	/// # Errors
	///
	/// Fails when `primary_implementation` is not one of `implementations`.
	pub fn new(
		implementations: HashMap<String, Arc<dyn BackendInterface>>,
		primary_implementation: String,
	) -> Result<Self, BackendError> {
		if !implementations.contains_key(&primary_implementation) {
			return Err(BackendError::Configuration(format!(
				"Primary implementation '{}' not found in available implementations",
				primary_implementation
			)));
		}

		Ok(Self {
			implementations,
			primary_implementation,
		})
	}

	/// Wraps a single implementation registered under `name`.
	pub fn single(name: impl Into<String>, implementation: Arc<dyn BackendInterface>) -> Self {
		let name = name.into();
		Self {
			implementations: HashMap::from([(name.clone(), implementation)]),
			primary_implementation: name,
		}
	}

	/// Name of the implementation requests are routed to.
	pub fn primary_name(&self) -> &str {
		&self.primary_implementation
	}

	fn primary(&self) -> Result<&Arc<dyn BackendInterface>, BackendError> {
		self.implementations
			.get(&self.primary_implementation)
			.ok_or_else(|| {
				BackendError::Configuration(format!(
					"Primary implementation '{}' not available",
					self.primary_implementation
				))
			})
	}

	pub async fn fetch_all(&self) -> Result<Vec<Order>, BackendError> {
		self.primary()?.fetch_all().await
	}

	pub async fn create(&self, draft: OrderDraft) -> Result<Order, BackendError> {
		self.primary()?.create(draft).await
	}

	pub async fn update(&self, id: &str, patch: OrderPatch) -> Result<Order, BackendError> {
		self.primary()?.update(id, patch).await
	}

	pub async fn delete(&self, id: &str) -> Result<(), BackendError> {
		self.primary()?.delete(id).await
	}
}
