//! Durable snapshot of the order store.
//!
//! The engine saves the store after every successful write and reloads it on
//! start, so a restarted client shows the last known orders and view before
//! the first fetch completes.

use crate::store::StoreSnapshot;
use chrono::{DateTime, Utc};
use fleet_storage::{StorageError, StorageService};
use fleet_types::StorageKey;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// What is written to the durable cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
	#[serde(flatten)]
	pub store: StoreSnapshot,
	pub saved_at: DateTime<Utc>,
}

/// A store snapshot stamped with the order in which it was taken.
#[derive(Debug, Clone)]
pub struct VersionedSnapshot {
	pub version: u64,
	pub store: StoreSnapshot,
}

/// Saves and loads [`PersistedState`] under a fixed namespace.
///
/// Snapshots are stamped while the store lock is held and saved after it is
/// released. [`SnapshotPersistence::save_in_order`] serializes those saves and
/// drops any snapshot older than the one already written, so the cache always
/// ends on the latest mutation.
pub struct SnapshotPersistence {
	storage: Arc<StorageService>,
	namespace: String,
	/// Last version handed out by `stamp`
	issued: AtomicU64,
	/// Last version written to storage
	written: Mutex<u64>,
}

impl SnapshotPersistence {
	pub fn new(storage: Arc<StorageService>, namespace: impl Into<String>) -> Self {
		Self {
			storage,
			namespace: namespace.into(),
			issued: AtomicU64::new(0),
			written: Mutex::new(0),
		}
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub async fn save(&self, store: StoreSnapshot) -> Result<(), StorageError> {
		let state = PersistedState {
			store,
			saved_at: fleet_types::now(),
		};
		self.storage
			.store(&self.namespace, StorageKey::Snapshot.as_str(), &state)
			.await
	}

	/// Stamps a snapshot with the next version.
	///
	/// Must be called while the store lock is held.
	pub fn stamp(&self, store: StoreSnapshot) -> VersionedSnapshot {
		VersionedSnapshot {
			version: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
			store,
		}
	}

	/// Saves a stamped snapshot unless a newer one was already written.
	///
	/// Returns whether the snapshot reached storage.
	pub async fn save_in_order(&self, snapshot: VersionedSnapshot) -> Result<bool, StorageError> {
		let mut written = self.written.lock().await;
		if snapshot.version <= *written {
			tracing::debug!(
				version = snapshot.version,
				written = *written,
				"Skipped outdated snapshot"
			);
			return Ok(false);
		}
		self.save(snapshot.store).await?;
		*written = snapshot.version;
		Ok(true)
	}

	/// Loads the last saved state. `None` when nothing was saved yet.
	pub async fn load(&self) -> Result<Option<PersistedState>, StorageError> {
		match self
			.storage
			.retrieve(&self.namespace, StorageKey::Snapshot.as_str())
			.await
		{
			Ok(state) => Ok(Some(state)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub async fn clear(&self) -> Result<(), StorageError> {
		self.storage
			.remove(&self.namespace, StorageKey::Snapshot.as_str())
			.await
	}
}
