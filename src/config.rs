//! Draft configuration - expiry, autosave cadence, key naming and backend.
//!
//! Every setting has a default; a TOML file only needs the keys it changes:
//!
//! ```toml
//! expiry_days = 7
//! autosave_interval_secs = 30   # 0 disables autosave
//! key_prefix = "wizard-draft-"
//!
//! [storage]
//! backend = "durable"           # session | durable | remote
//! dir = "/var/lib/app/drafts"
//! quota_bytes = 5242880
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_KEY_PREFIX: &str = "wizard-draft-";
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing config key: {0}")]
    Missing(&'static str),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which physical backend holds the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-process; gone when the session ends.
    Session { quota_bytes: Option<u64> },
    /// Files in a directory; survives restarts.
    Durable {
        dir: PathBuf,
        quota_bytes: Option<u64>,
    },
    /// A remote draft service.
    Remote { endpoint: String, timeout: Duration },
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Session { quota_bytes: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftConfig {
    /// Snapshots older than this are treated as absent.
    pub expiry: Duration,
    /// Autosave cadence; `None` disables the timer.
    pub autosave_interval: Option<Duration>,
    pub key_prefix: String,
    pub storage: StorageBackend,
}

impl Default for DraftConfig {
    fn default() -> Self {
        DraftConfig {
            expiry: DEFAULT_EXPIRY,
            autosave_interval: Some(DEFAULT_AUTOSAVE_INTERVAL),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            storage: StorageBackend::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum TomlBackendKind {
    Session,
    Durable,
    Remote,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlStorageConfig {
    backend: Option<TomlBackendKind>,
    dir: Option<PathBuf>,
    quota_bytes: Option<u64>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlDraftConfig {
    expiry_days: Option<u64>,
    autosave_interval_secs: Option<u64>,
    key_prefix: Option<String>,
    storage: Option<TomlStorageConfig>,
}

impl DraftConfig {
    pub fn with_storage(mut self, storage: StorageBackend) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_autosave(mut self, interval: Option<Duration>) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration, merging the given keys over the defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let toml_config: TomlDraftConfig = toml::from_str(contents)?;
        let mut config = DraftConfig::default();

        if let Some(days) = toml_config.expiry_days {
            if days == 0 {
                return Err(ConfigError::Invalid("expiry_days must be at least 1".into()));
            }
            config.expiry = Duration::from_secs(days * 24 * 60 * 60);
        }
        if let Some(secs) = toml_config.autosave_interval_secs {
            config.autosave_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(prefix) = toml_config.key_prefix {
            config.key_prefix = prefix;
        }
        if let Some(storage) = toml_config.storage {
            config.storage = storage.into_backend()?;
        }

        Ok(config)
    }
}

impl TomlStorageConfig {
    fn into_backend(self) -> Result<StorageBackend, ConfigError> {
        match self.backend.unwrap_or(TomlBackendKind::Session) {
            TomlBackendKind::Session => Ok(StorageBackend::Session {
                quota_bytes: self.quota_bytes,
            }),
            TomlBackendKind::Durable => Ok(StorageBackend::Durable {
                dir: self.dir.ok_or(ConfigError::Missing("storage.dir"))?,
                quota_bytes: self.quota_bytes,
            }),
            TomlBackendKind::Remote => {
                let endpoint = self.endpoint.ok_or(ConfigError::Missing("storage.endpoint"))?;
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err(ConfigError::Invalid(format!(
                        "storage.endpoint must be an http(s) URL, got {endpoint}"
                    )));
                }
                Ok(StorageBackend::Remote {
                    endpoint,
                    timeout: self
                        .timeout_secs
                        .map(Duration::from_secs)
                        .unwrap_or(DEFAULT_REMOTE_TIMEOUT),
                })
            }
        }
    }
}
