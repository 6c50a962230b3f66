//! Builder for constructing order engines from configuration.
//!
//! Storage and backend implementations are created through factory functions
//! looked up by the names used in the configuration, so a binary decides which
//! implementations exist and the configuration decides which one is used.

use crate::engine::{event_bus::EventBus, EngineOptions, OrderEngine};
use crate::persistence::SnapshotPersistence;
use fleet_backend::{BackendError, BackendInterface, BackendService};
use fleet_config::Config;
use fleet_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct EngineFactories<SF, BF> {
	pub storage_factories: HashMap<String, SF>,
	pub backend_factories: HashMap<String, BF>,
}

/// Builds an [`OrderEngine`] with pluggable implementations.
pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub async fn build<SF, BF>(
		self,
		factories: EngineFactories<SF, BF>,
	) -> Result<OrderEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		BF: Fn(&toml::Value) -> Result<Box<dyn BackendInterface>, BackendError>,
	{
		let persistence = if self.config.persistence.enabled {
			let storage = self.build_storage(&factories.storage_factories)?;
			Some(Arc::new(SnapshotPersistence::new(
				storage,
				self.config.persistence.namespace.clone(),
			)))
		} else {
			tracing::info!(component = "persistence", enabled = false, "Skipped");
			None
		};

		let backend = self.build_backend(&factories.backend_factories)?;

		let options = EngineOptions {
			transition_policy: self.config.engine.transition_policy,
			fetch_arbitration: self.config.engine.fetch_arbitration,
			pagination: self.config.default_pagination(),
		};
		tracing::info!(
			engine = %self.config.engine.id,
			transition_policy = ?options.transition_policy,
			fetch_arbitration = ?options.fetch_arbitration,
			"Engine configured"
		);

		Ok(OrderEngine::new(
			self.config.engine.id.clone(),
			backend,
			persistence,
			EventBus::new(self.config.engine.event_capacity),
			options,
		))
	}

	fn build_storage<SF>(
		&self,
		factories: &HashMap<String, SF>,
	) -> Result<Arc<StorageService>, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "No factory registered");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					storage_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary = &self.config.storage.primary;
		let backend = storage_impls.remove(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;
		Ok(Arc::new(StorageService::new(backend)))
	}

	fn build_backend<BF>(
		&self,
		factories: &HashMap<String, BF>,
	) -> Result<Arc<BackendService>, BuilderError>
	where
		BF: Fn(&toml::Value) -> Result<Box<dyn BackendInterface>, BackendError>,
	{
		let mut backend_impls: HashMap<String, Arc<dyn BackendInterface>> = HashMap::new();
		for (name, config) in &self.config.backend.implementations {
			let Some(factory) = factories.get(name) else {
				tracing::warn!(component = "backend", implementation = %name, "No factory registered");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.backend.primary == name;
					tracing::info!(component = "backend", implementation = %name, enabled = %is_primary, "Loaded");
					backend_impls.insert(name.clone(), Arc::from(implementation));
				},
				Err(e) => {
					tracing::error!(
						component = "backend",
						implementation = %name,
						error = %e,
						"Failed to create backend implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create backend implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary = &self.config.backend.primary;
		if !backend_impls.contains_key(primary) {
			return Err(BuilderError::MissingComponent(format!(
				"backend implementation '{}'",
				primary
			)));
		}
		let service = BackendService::new(backend_impls, primary.clone())
			.map_err(|e| BuilderError::Config(e.to_string()))?;
		Ok(Arc::new(service))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fleet_backend::BackendFactory;
	use fleet_storage::StorageFactory;
	use fleet_types::{OrderStatus, TransitionPolicy};
	use tempfile::TempDir;

	fn factories() -> EngineFactories<StorageFactory, BackendFactory> {
		EngineFactories {
			storage_factories: fleet_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			backend_factories: fleet_backend::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	fn config(body: &str) -> Config {
		body.parse().unwrap()
	}

	#[tokio::test]
	async fn test_build_from_config() {
		let temp_dir = TempDir::new().unwrap();
		let seed = temp_dir.path().join("seed.json");
		let orders = vec![crate::store::tests::order("ORD-7", "Sarah Johnson", OrderStatus::Shipped, 70)];
		std::fs::write(&seed, serde_json::to_string(&orders).unwrap()).unwrap();

		let config = config(&format!(
			r#"
[engine]
id = "depot-east"
transition_policy = "strict"

[view]
default_page_size = 25

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"

[backend]
primary = "memory"
[backend.implementations.memory]
seed_file = "{}"
"#,
			temp_dir.path().join("cache").display(),
			seed.display()
		));

		let engine = EngineBuilder::new(config).build(factories()).await.unwrap();
		assert_eq!(engine.id(), "depot-east");
		assert_eq!(engine.options().transition_policy, TransitionPolicy::Strict);
		assert_eq!(engine.pagination().await.limit, 25);

		engine.fetch_all().await.unwrap();
		assert_eq!(engine.get("ORD-7").await.unwrap().customer.name, "Sarah Johnson");
	}

	#[tokio::test]
	async fn test_persistence_disabled() {
		let config = config(
			r#"
[engine]
id = "depot-west"

[storage]
primary = "memory"
[storage.implementations.memory]

[persistence]
enabled = false

[backend]
primary = "memory"
[backend.implementations.memory]
"#,
		);

		let engine = EngineBuilder::new(config).build(factories()).await.unwrap();
		assert_eq!(engine.restore().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_missing_factory() {
		let config = config(
			r#"
[engine]
id = "depot-west"

[storage]
primary = "memory"
[storage.implementations.memory]

[backend]
primary = "memory"
[backend.implementations.memory]
"#,
		);

		let mut factories = factories();
		factories.backend_factories.clear();
		let result = EngineBuilder::new(config).build(factories).await;
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[tokio::test]
	async fn test_invalid_implementation_config() {
		let config = config(
			r#"
[engine]
id = "depot-west"

[storage]
primary = "memory"
[storage.implementations.memory]

[backend]
primary = "memory"
[backend.implementations.memory]
latency_ms = -4
"#,
		);

		let result = EngineBuilder::new(config).build(factories()).await;
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}
}
