use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::error::StorageError;
use super::SnapshotStore;

/// Session-scoped snapshot store backed by `Arc<RwLock<HashMap>>`.
///
/// Clone-friendly (cloning shares the same underlying storage). Contents
/// live as long as any clone does, and are gone when the process exits.
#[derive(Clone)]
pub struct SessionSnapshotStore {
    storage: Arc<RwLock<HashMap<String, String>>>,
    quota_bytes: Option<u64>,
}

impl Default for SessionSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSnapshotStore {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            quota_bytes: None,
        }
    }

    /// Limit the total bytes held across all keys.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for SessionSnapshotStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::Unavailable("session store lock poisoned".into()))?;
        Ok(storage.get(key).cloned())
    }

    fn write_raw(&self, key: &str, payload: String) -> Result<(), StorageError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StorageError::Unavailable("session store lock poisoned".into()))?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = storage
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = (others + key.len() + payload.len()) as u64;
            if needed > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{needed} bytes needed, session quota is {quota}"
                )));
            }
        }

        storage.insert(key.to_string(), payload);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StorageError::Unavailable("session store lock poisoned".into()))?;
        Ok(storage.remove(key).is_some())
    }
}
