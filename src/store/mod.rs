//! Snapshot stores - key-based persistence for draft snapshots.
//!
//! Backends implement three raw operations over JSON payloads; the typed
//! `write` / `read` helpers on the trait handle encoding and absorb
//! corruption so callers never see a half-parsed snapshot.
//!
//! - `SessionSnapshotStore` - lives as long as the process (and its clones).
//! - `FileSnapshotStore` - one JSON file per key, survives restarts.
//! - `RemoteSnapshotStore` - HTTP client for a remote draft service
//!   (requires the `remote` feature).
//!
//! With the `http` feature, `http::router` serves any store over HTTP.

mod durable;
mod error;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "remote")]
mod remote;
mod session;

use std::sync::Arc;

use crate::config::StorageBackend;
use crate::snapshot::Snapshot;

pub use durable::FileSnapshotStore;
pub use error::{SaveFailure, StorageError};
#[cfg(feature = "remote")]
pub use remote::RemoteSnapshotStore;
pub use session::SessionSnapshotStore;

/// Trait for snapshot persistence. One snapshot per key (latest wins).
pub trait SnapshotStore: Send + Sync {
    /// Load the raw payload stored under `key`.
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Save (or overwrite) the raw payload under `key`.
    fn write_raw(&self, key: &str, payload: String) -> Result<(), StorageError>;

    /// Delete the payload under `key`. Returns true if one existed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Encode and save a snapshot. Encoding failures count as quota failures:
    /// either way, nothing was saved.
    fn write(&self, key: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|e| StorageError::QuotaExceeded(format!("snapshot serialize: {e}")))?;
        self.write_raw(key, payload)
    }

    /// Load and decode a snapshot. Read failures and corrupt payloads are
    /// logged and reported as absent.
    fn read(&self, key: &str) -> Option<Snapshot> {
        let payload = match self.read_raw(key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(key, %error, "snapshot read failed; treating as absent");
                return None;
            }
        };
        match serde_json::from_str::<Snapshot>(&payload) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                let error = StorageError::Corrupt(e.to_string());
                tracing::warn!(key, %error, "discarding unreadable snapshot");
                None
            }
        }
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Arc<S> {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).read_raw(key)
    }

    fn write_raw(&self, key: &str, payload: String) -> Result<(), StorageError> {
        (**self).write_raw(key, payload)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        (**self).delete(key)
    }
}

/// Open the store selected by configuration.
pub fn open_store(backend: &StorageBackend) -> Result<Arc<dyn SnapshotStore>, StorageError> {
    match backend {
        StorageBackend::Session { quota_bytes } => {
            let store = match quota_bytes {
                Some(quota) => SessionSnapshotStore::with_quota(*quota),
                None => SessionSnapshotStore::new(),
            };
            Ok(Arc::new(store))
        }
        StorageBackend::Durable { dir, quota_bytes } => {
            let mut store = FileSnapshotStore::open(dir)?;
            if let Some(quota) = quota_bytes {
                store = store.with_quota(*quota);
            }
            Ok(Arc::new(store))
        }
        #[cfg(feature = "remote")]
        StorageBackend::Remote { endpoint, timeout } => {
            Ok(Arc::new(RemoteSnapshotStore::new(endpoint, *timeout)?))
        }
        #[cfg(not(feature = "remote"))]
        StorageBackend::Remote { endpoint, .. } => Err(StorageError::Unavailable(format!(
            "remote backend {endpoint} requires the `remote` feature"
        ))),
    }
}
