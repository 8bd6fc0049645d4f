use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::error::StorageError;
use super::SnapshotStore;

/// Durable snapshot store: one `<key>.json` file per key inside a directory.
///
/// Writes go through a temporary file and an atomic rename, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileSnapshotStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Unavailable(format!("create {}: {}", dir.display(), e))
        })?;
        Ok(FileSnapshotStore {
            dir,
            quota_bytes: None,
        })
    }

    /// Limit the total bytes of snapshot files in the directory.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_file_name(key)))
    }

    fn used_bytes_excluding(&self, skip: &Path) -> Result<u64, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| unavailable(&self.dir, e))?;
        let mut total = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                total += meta.len();
            }
        }
        Ok(total)
    }
}

/// Reversible file name for a key: `[A-Za-z0-9.-]` is kept, every other
/// byte (including `_`) becomes `_XX` hex, so distinct keys never share a file.
fn encode_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' => name.push(byte as char),
            _ => name.push_str(&format!("_{byte:02X}")),
        }
    }
    name
}

fn unavailable(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Unavailable(format!("{}: {}", path.display(), err))
}

impl SnapshotStore for FileSnapshotStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                Err(StorageError::Corrupt(format!("{}: {}", path.display(), e)))
            }
            Err(e) => Err(unavailable(&path, e)),
        }
    }

    fn write_raw(&self, key: &str, payload: String) -> Result<(), StorageError> {
        let path = self.path_for(key);

        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_excluding(&path)? + payload.len() as u64;
            if needed > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{needed} bytes needed, durable quota is {quota}"
                )));
            }
        }

        let tmp = path.with_extension("json.tmp");
        let result = (|| {
            let mut file = File::create(&tmp)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        })();

        result.map_err(|e| {
            let _ = fs::remove_file(&tmp);
            unavailable(&path, e)
        })
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}
