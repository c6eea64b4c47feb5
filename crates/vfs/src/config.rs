use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CONTEXTS: u64 = 1000;
pub const DEFAULT_FRESHNESS_TTL_SECS: u64 = 300;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;

/// Settings for both halves of the crate, usually read from a
///  `vfs.toml` next to the embedding application's own config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfsConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub temp: TempConfig,
}

impl VfsConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Which [`ContextStore`](crate::cache::ContextStore) backs the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Map,
    Bounded,
    Noop,
}

/// Which [`FreshnessPolicy`](crate::cache::FreshnessPolicy) guards the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessKind {
    #[default]
    Always,
    Ttl,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub store: StoreKind,
    /// Capacity of a bounded store
    #[serde(default = "default_max_contexts")]
    pub max_contexts: u64,
    /// Per-context time-to-live in a bounded store
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    /// Per-context time-to-idle in a bounded store
    #[serde(default)]
    pub idle_secs: Option<u64>,
    #[serde(default)]
    pub freshness: FreshnessKind,
    /// Window after which the ttl freshness policy clears the cache
    #[serde(default = "default_freshness_ttl_secs")]
    pub freshness_ttl_secs: u64,
}

fn default_max_contexts() -> u64 {
    DEFAULT_MAX_CONTEXTS
}

fn default_freshness_ttl_secs() -> u64 {
    DEFAULT_FRESHNESS_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            max_contexts: default_max_contexts(),
            ttl_secs: None,
            idle_secs: None,
            freshness: FreshnessKind::default(),
            freshness_ttl_secs: default_freshness_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }

    pub fn idle(&self) -> Option<Duration> {
        self.idle_secs.map(Duration::from_secs)
    }

    pub fn freshness_ttl(&self) -> Duration {
        Duration::from_secs(self.freshness_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempConfig {
    /// Replaces the system temp directory: provider roots go under
    ///  `<base_dir>/vfs`. When unset the process-wide base
    ///  (`$VFS_TMP_DIR/vfs` or the system temp dir) is used
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Delay between cleanup passes over a root that could not be removed
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_retry_delay_secs() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

impl Default for TempConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl TempConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
