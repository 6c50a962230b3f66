//! Storage-related types for the durable local cache.

use std::str::FromStr;

/// Storage namespaces used by the engine.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Snapshot of the order store and its view state
	Snapshot,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Snapshot => "snapshot",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Snapshot].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"snapshot" => Ok(Self::Snapshot),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_keys_parse_back() {
		for key in StorageKey::all() {
			assert_eq!(key.as_str().parse::<StorageKey>(), Ok(key));
		}
		assert!("orders".parse::<StorageKey>().is_err());
	}
}
