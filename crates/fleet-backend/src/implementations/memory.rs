//! In-memory backend implementation for development and testing.
//!
//! Orders live in a vector guarded by a lock. The backend can be seeded from
//! a JSON file, can simulate network latency and can be told to fail upcoming
//! calls so that error paths of the engine can be exercised.

use crate::{BackendError, BackendFactory, BackendInterface, BackendRegistry};
use async_trait::async_trait;
use chrono::Utc;
use fleet_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Order, OrderDraft, OrderPatch, Schema,
	ValidationError,
};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Prefix of generated order ids when none is configured.
const DEFAULT_ID_PREFIX: &str = "ORD-";

/// Backend that keeps orders in process memory.
pub struct MemoryBackend {
	orders: RwLock<Vec<Order>>,
	id_prefix: String,
	latency: Duration,
	/// Messages of transport failures to return on the next calls.
	pending_failures: Mutex<VecDeque<String>>,
}

impl MemoryBackend {
	/// Creates a backend holding `orders`, newest first.
	pub fn new(orders: Vec<Order>) -> Self {
		Self {
			orders: RwLock::new(orders),
			id_prefix: DEFAULT_ID_PREFIX.to_string(),
			latency: Duration::ZERO,
			pending_failures: Mutex::new(VecDeque::new()),
		}
	}

	/// Sets the prefix of generated ids.
	pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.id_prefix = prefix.into();
		self
	}

	/// Delays every call by `latency`.
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	/// Makes the next call fail with a transport error carrying `message`.
	///
	/// Several failures queue up and are consumed one per call.
	pub async fn fail_next(&self, message: impl Into<String>) {
		self.pending_failures.lock().await.push_back(message.into());
	}

	/// Simulates the round trip: waits for the configured latency and
	/// returns a queued failure if there is one.
	async fn round_trip(&self) -> Result<(), BackendError> {
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}
		match self.pending_failures.lock().await.pop_front() {
			Some(message) => Err(BackendError::Transport(message)),
			None => Ok(()),
		}
	}

	fn next_id(&self) -> String {
		format!("{}{}", self.id_prefix, Uuid::new_v4().simple())
	}
}

impl Default for MemoryBackend {
	fn default() -> Self {
		Self::new(Vec::new())
	}
}

#[async_trait]
impl BackendInterface for MemoryBackend {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryBackendSchema)
	}

	async fn fetch_all(&self) -> Result<Vec<Order>, BackendError> {
		self.round_trip().await?;
		Ok(self.orders.read().await.clone())
	}

	async fn create(&self, draft: OrderDraft) -> Result<Order, BackendError> {
		self.round_trip().await?;
		draft
			.validate()
			.map_err(|e| BackendError::Rejected(e.to_string()))?;

		let order = Order::from_draft(self.next_id(), draft, Utc::now());
		self.orders.write().await.insert(0, order.clone());
		tracing::debug!(order_id = %order.id, "Created order in memory backend");
		Ok(order)
	}

	async fn update(&self, id: &str, patch: OrderPatch) -> Result<Order, BackendError> {
		self.round_trip().await?;
		let mut orders = self.orders.write().await;
		let order = orders
			.iter_mut()
			.find(|o| o.id == id)
			.ok_or_else(|| BackendError::NotFound(id.to_string()))?;
		order.apply_patch(patch, Utc::now());
		Ok(order.clone())
	}

	async fn delete(&self, id: &str) -> Result<(), BackendError> {
		self.round_trip().await?;
		let mut orders = self.orders.write().await;
		let before = orders.len();
		orders.retain(|o| o.id != id);
		if orders.len() == before {
			return Err(BackendError::NotFound(id.to_string()));
		}
		Ok(())
	}
}

/// Configuration schema for MemoryBackend.
pub struct MemoryBackendSchema;

impl ConfigSchema for MemoryBackendSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("seed_file", FieldType::String),
				Field::new("id_prefix", FieldType::String),
				Field::new(
					"latency_ms",
					FieldType::Integer {
						min: Some(0),
						max: Some(60_000),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a memory backend from configuration.
///
/// Configuration parameters:
/// - `seed_file`: JSON file holding an array of orders to start with
/// - `id_prefix`: Prefix of generated order ids (default: "ORD-")
/// - `latency_ms`: Simulated round trip latency (default: 0)
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn BackendInterface>, BackendError> {
	MemoryBackendSchema
		.validate(config)
		.map_err(|e| BackendError::Configuration(e.to_string()))?;

	let orders = match config.get("seed_file").and_then(|v| v.as_str()) {
		Some(path) => {
			let content = std::fs::read_to_string(path).map_err(|e| {
				BackendError::Configuration(format!("Cannot read seed file {}: {}", path, e))
			})?;
			let orders: Vec<Order> = serde_json::from_str(&content).map_err(|e| {
				BackendError::Configuration(format!("Invalid seed file {}: {}", path, e))
			})?;
			tracing::info!(count = orders.len(), seed_file = path, "Seeded memory backend");
			orders
		},
		None => Vec::new(),
	};

	let mut backend = MemoryBackend::new(orders);
	if let Some(prefix) = config.get("id_prefix").and_then(|v| v.as_str()) {
		backend = backend.with_id_prefix(prefix);
	}
	if let Some(latency_ms) = config.get("latency_ms").and_then(|v| v.as_integer()) {
		backend = backend.with_latency(Duration::from_millis(latency_ms.unsigned_abs()));
	}

	Ok(Box::new(backend))
}

/// Registry for the memory backend implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = BackendFactory;

	fn factory() -> Self::Factory {
		create_backend
	}
}

impl BackendRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use fleet_types::{Customer, OrderStatus};
	use rust_decimal::Decimal;
	use std::io::Write;

	fn draft(name: &str) -> OrderDraft {
		OrderDraft {
			customer: Customer::new(name, format!("{}@example.com", name), "555-0100"),
			total: Some(Decimal::from(40)),
			shipping_address: "12 Depot Road".to_string(),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_create_assigns_id_and_prepends() {
		let backend = MemoryBackend::default().with_id_prefix("TST-");

		let first = backend.create(draft("ana")).await.unwrap();
		let second = backend.create(draft("ben")).await.unwrap();
		assert!(first.id.starts_with("TST-"));
		assert_ne!(first.id, second.id);

		let all = backend.fetch_all().await.unwrap();
		assert_eq!(all[0].id, second.id);
		assert_eq!(all[1].id, first.id);
	}

	#[tokio::test]
	async fn test_update_and_delete() {
		let backend = MemoryBackend::default();
		let created = backend.create(draft("ana")).await.unwrap();

		let updated = backend
			.update(&created.id, OrderPatch::status(OrderStatus::Shipped))
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Shipped);
		assert!(updated.updated_at > created.updated_at);

		backend.delete(&created.id).await.unwrap();
		assert!(matches!(
			backend.delete(&created.id).await,
			Err(BackendError::NotFound(_))
		));
		assert!(matches!(
			backend.update(&created.id, OrderPatch::default()).await,
			Err(BackendError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_injected_failures_are_consumed_in_order() {
		let backend = MemoryBackend::default();
		backend.fail_next("gateway timeout").await;
		backend.fail_next("connection refused").await;

		let first = backend.fetch_all().await.unwrap_err();
		let second = backend.fetch_all().await.unwrap_err();
		assert_eq!(first.to_string(), "gateway timeout");
		assert_eq!(second.to_string(), "connection refused");
		assert!(backend.fetch_all().await.is_ok());
	}

	#[tokio::test]
	async fn test_factory_with_seed_file() {
		let seed = Order::from_draft("SEED-1", draft("cara"), Utc::now());
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "{}", serde_json::to_string(&vec![seed.clone()]).unwrap()).unwrap();

		let mut table = toml::map::Map::new();
		table.insert(
			"seed_file".to_string(),
			toml::Value::String(file.path().display().to_string()),
		);
		let backend = create_backend(&toml::Value::Table(table)).unwrap();

		let all = backend.fetch_all().await.unwrap();
		assert_eq!(all, vec![seed]);
	}

	#[test]
	fn test_factory_rejects_negative_latency() {
		let config: toml::Value = toml::from_str("latency_ms = -5").unwrap();
		assert!(matches!(
			create_backend(&config),
			Err(BackendError::Configuration(_))
		));
	}
}
