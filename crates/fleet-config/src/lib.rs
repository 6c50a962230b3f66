//! Configuration module for the fleet order engine.
//!
//! Configuration is read from TOML. Values may reference environment
//! variables with `${VAR}` or `${VAR:-default}`, and a file may pull in other
//! files through `include = ["storage.toml"]`, as long as every top-level
//! section is defined exactly once across all files.

mod loader;

use fleet_types::{FetchArbitration, PaginationState, TransitionPolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Largest page size accepted for `view.default_page_size`.
const MAX_PAGE_SIZE: u32 = 500;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Engine identity and behaviour switches.
	pub engine: EngineConfig,
	/// Defaults for derived views.
	#[serde(default)]
	pub view: ViewConfig,
	/// Storage backends for the durable local cache.
	pub storage: StorageConfig,
	/// Snapshot persistence settings.
	#[serde(default)]
	pub persistence: PersistenceConfig,
	/// Backend implementations the orchestrator talks to.
	pub backend: BackendConfig,
}

/// Engine identity and behaviour switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Identifier of this engine instance, used in logs.
	pub id: String,
	/// Whether status changes are restricted to the recommended lifecycle.
	#[serde(default)]
	pub transition_policy: TransitionPolicy,
	/// Which concurrent `fetch_all` response is applied.
	#[serde(default)]
	pub fetch_arbitration: FetchArbitration,
	/// Capacity of the change notification channel.
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
	256
}

/// Defaults for derived views.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewConfig {
	/// Number of orders per page when the client has not chosen one.
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			default_page_size: default_page_size(),
		}
	}
}

fn default_page_size() -> u32 {
	PaginationState::DEFAULT_LIMIT
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
	/// Save after every write and reload on start.
	#[serde(default = "default_persistence_enabled")]
	pub enabled: bool,
	/// Fixed namespace the snapshot is stored under.
	#[serde(default = "default_namespace")]
	pub namespace: String,
}

impl Default for PersistenceConfig {
	fn default() -> Self {
		Self {
			enabled: default_persistence_enabled(),
			namespace: default_namespace(),
		}
	}
}

fn default_persistence_enabled() -> bool {
	true
}

fn default_namespace() -> String {
	"fleet_orders".to_string()
}

/// Configuration for the order backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of backend implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with the text after
/// `:-` in `${VAR_NAME:-default}` when the variable is unset.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut output = String::with_capacity(input.len());
	let mut last_end = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						name.as_str()
					)))
				},
			},
		};
		output.push_str(&input[last_end..whole.start()]);
		output.push_str(&value);
		last_end = whole.end();
	}
	output.push_str(&input[last_end..]);

	Ok(output)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;

		let mut loader = ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// Page size used when the client has not chosen one.
	pub fn default_pagination(&self) -> PaginationState {
		PaginationState::new(1, self.view.default_page_size)
	}

	/// Checks cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.engine.id.trim().is_empty() {
			return Err(ConfigError::Validation("Engine ID cannot be empty".into()));
		}
		if self.engine.event_capacity == 0 {
			return Err(ConfigError::Validation(
				"engine.event_capacity must be greater than 0".into(),
			));
		}

		if self.view.default_page_size == 0 || self.view.default_page_size > MAX_PAGE_SIZE {
			return Err(ConfigError::Validation(format!(
				"view.default_page_size must be between 1 and {}",
				MAX_PAGE_SIZE
			)));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_primary("backend", &self.backend.primary, &self.backend.implementations)?;

		if self.persistence.enabled {
			let namespace = &self.persistence.namespace;
			if namespace.is_empty() || namespace.contains(':') {
				return Err(ConfigError::Validation(format!(
					"persistence.namespace '{}' must be non-empty and must not contain ':'",
					namespace
				)));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
