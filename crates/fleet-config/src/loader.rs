//! Multi-file configuration loading.
//!
//! A configuration file may list other files in an `include` key. Included
//! files are merged section by section into the including file; a section
//! defined twice is an error, and so is a file that is reached twice.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a configuration file together with its includes.
pub struct ConfigLoader {
	/// Directory relative includes are resolved against
	base_path: PathBuf,
	/// Canonical paths already read, for cycle detection
	loaded_files: HashSet<PathBuf>,
	/// File each top-level section came from, for error messages
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads, merges, parses and validates a configuration.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let main_path = self.resolve_path(config_path)?;
		let mut merged: toml::Value = toml::from_str(&self.read_file(&main_path).await?)?;

		let includes = extract_includes(&merged)?;
		let Some(table) = merged.as_table_mut() else {
			return Err(ConfigError::Validation(
				"Configuration root must be a table".into(),
			));
		};
		table.remove("include");
		for key in table.keys() {
			self.section_sources.insert(key.clone(), main_path.clone());
		}

		for include in includes {
			let include_path = self.resolve_path(&include)?;
			let included: toml::Value =
				toml::from_str(&self.read_file(&include_path).await?)?;
			let Some(included_table) = included.as_table() else {
				continue;
			};

			for (key, value) in included_table {
				if let Some(existing) = self.section_sources.get(key) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' found in {} and {}",
						key,
						existing.display(),
						include_path.display()
					)));
				}
				self.section_sources
					.insert(key.clone(), include_path.clone());
				table.insert(key.clone(), value.clone());
			}
		}

		let combined = toml::to_string(&merged)
			.map_err(|e| ConfigError::Parse(format!("Failed to serialize combined config: {}", e)))?;
		combined.parse()
	}

	/// Reads a file once, substituting environment variables.
	async fn read_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(&canonical).await?;
		resolve_env_vars(&content)
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

/// Reads the `include` key, which may be a single path or an array of paths.
fn extract_includes(toml: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match toml.get("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.iter()
			.map(|item| {
				item.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("Include array must contain only strings".into())
				})
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const ENGINE: &str = r#"
[engine]
id = "depot-south"
"#;

	const BACKENDS: &str = r#"
[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data"

[backend]
primary = "memory"
[backend.implementations.memory]
latency_ms = 10
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");
		fs::write(&config_path, format!("{}{}", ENGINE, BACKENDS)).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();

		assert_eq!(config.engine.id, "depot-south");
		assert_eq!(config.storage.primary, "file");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = [\"backends.toml\"]\n{}", ENGINE);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("backends.toml"), BACKENDS).unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml"))
			.await
			.unwrap();

		assert_eq!(config.engine.id, "depot-south");
		assert_eq!(config.backend.primary, "memory");
		assert_eq!(
			config.backend.implementations["memory"]
				.get("latency_ms")
				.and_then(|v| v.as_integer()),
			Some(10)
		);
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = \"dup.toml\"\n{}{}", ENGINE, BACKENDS);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("dup.toml"), ENGINE).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("Duplicate section 'engine'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		let config = format!("include = [\"self.toml\"]\n{}", ENGINE);
		fs::write(temp_dir.path().join("self.toml"), config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("self.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("already loaded"));
	}

	#[tokio::test]
	async fn test_sample_config_loads() {
		let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/fleet.toml");
		let config = Config::from_file(&path).await.unwrap();

		assert_eq!(config.storage.primary, "file");
		assert_eq!(config.storage.implementations.len(), 2);
		assert_eq!(config.backend.primary, "memory");
		assert_eq!(config.persistence.namespace, "fleet_orders");
	}

	#[tokio::test]
	async fn test_missing_include() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = [\"absent.toml\"]\n{}", ENGINE);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("main.toml").await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
