//! Registry of every storage and backend implementation compiled into the
//! binary, and engine construction from configuration.

use fleet_backend::BackendFactory;
use fleet_config::Config;
use fleet_core::{EngineBuilder, EngineFactories, OrderEngine};
use fleet_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Available implementation factories, keyed by name.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub backend: HashMap<String, BackendFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			backend: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_backend(&mut self, name: impl Into<String>, factory: BackendFactory) {
		self.backend.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in fleet_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in fleet_backend::get_all_implementations() {
			tracing::debug!("Registering backend implementation: {}", name);
			registry.register_backend(name, factory);
		}

		registry
	})
}

/// Picks the factories named in `configured`, failing on unknown names.
fn select_factories<F: Copy>(
	available: &HashMap<String, F>,
	configured: &HashMap<String, toml::Value>,
	kind: &str,
) -> Result<HashMap<String, F>, String> {
	let mut factories = HashMap::new();
	for name in configured.keys() {
		let Some(factory) = available.get(name) else {
			let mut known: Vec<_> = available.keys().cloned().collect();
			known.sort();
			return Err(format!(
				"Unknown {} implementation '{}'. Available: [{}]",
				kind,
				name,
				known.join(", ")
			));
		};
		factories.insert(name.clone(), *factory);
	}
	Ok(factories)
}

/// Builds an engine from configuration using the registered implementations.
pub async fn build_engine_from_config(
	config: Config,
) -> Result<OrderEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let factories = EngineFactories {
		storage_factories: select_factories(
			&registry.storage,
			&config.storage.implementations,
			"storage",
		)?,
		backend_factories: select_factories(
			&registry.backend,
			&config.backend.implementations,
			"backend",
		)?,
	};

	Ok(EngineBuilder::new(config).build(factories).await?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_registry_has_shipped_implementations() {
		let registry = get_registry();
		assert!(registry.storage.contains_key("file"));
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.backend.contains_key("memory"));
	}

	#[tokio::test]
	async fn test_unknown_implementation_reported() {
		let config: Config = r#"
[engine]
id = "depot"

[storage]
primary = "memory"
[storage.implementations.memory]

[backend]
primary = "rest"
[backend.implementations.rest]
"#
		.parse()
		.unwrap();

		let err = build_engine_from_config(config).await.err().unwrap();
		assert!(err.to_string().contains("Unknown backend implementation 'rest'"));
		assert!(err.to_string().contains("memory"));
	}
}
