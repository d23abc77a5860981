pub mod catalog;

use chrono::FixedOffset;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{Result, TrackerError};
use crate::remote::DEFAULT_REMOTE_TABLE;
use crate::status::{default_display_offset, parse_utc_offset};

pub use catalog::{BossRoster, Catalog, GroupConfig};

pub const ENV_DATA_DIR: &str = "BOSSWATCH_DATA_DIR";
pub const ENV_CATALOG: &str = "BOSSWATCH_CATALOG";
pub const ENV_UTC_OFFSET: &str = "BOSSWATCH_UTC_OFFSET";
pub const ENV_REMOTE_URL: &str = "BOSSWATCH_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "BOSSWATCH_REMOTE_KEY";
pub const ENV_REMOTE_TABLE: &str = "BOSSWATCH_REMOTE_TABLE";
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "BOSSWATCH_REMOTE_TIMEOUT_SECS";

/// Connection settings for the shared remote table
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the PostgREST/Supabase project
    pub url: String,

    /// API key, sent both as `apikey` and as bearer token
    pub api_key: String,

    /// Table holding one row per (group, boss)
    pub table: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: DEFAULT_REMOTE_TABLE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the table name
    pub fn table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(TrackerError::Config(format!(
                "remote url '{}' must start with http:// or https://",
                self.url
            )));
        }
        if self.api_key.is_empty() {
            return Err(TrackerError::Config("remote api key cannot be empty".into()));
        }
        if self.table.is_empty() {
            return Err(TrackerError::Config("remote table cannot be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(TrackerError::Config("remote timeout must be > 0".into()));
        }
        Ok(())
    }
}

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Directory holding one JSON file per group
    pub data_dir: PathBuf,

    /// Canonical groups and bosses
    pub catalog_path: PathBuf,

    /// Offset used to render timestamps and to read `HH:MM` input
    pub display_offset: FixedOffset,

    /// Remote replica; `None` keeps everything local
    pub remote: Option<RemoteConfig>,
}

impl TrackerConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            catalog_path: PathBuf::from("catalog.json"),
            display_offset: default_display_offset(),
            remote: None,
        }
    }

    /// Set the catalog file
    pub fn catalog_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.catalog_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the display offset
    pub fn display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    /// Enable remote sync
    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Build from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// Remote sync is enabled only when both the url and the key are present.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self::new(get(ENV_DATA_DIR).unwrap_or_else(|| "bosswatch_data".to_string()));

        if let Some(catalog) = get(ENV_CATALOG) {
            config = config.catalog_path(catalog);
        }

        if let Some(offset) = get(ENV_UTC_OFFSET) {
            config = config.display_offset(parse_utc_offset(&offset)?);
        }

        if let (Some(url), Some(key)) = (get(ENV_REMOTE_URL), get(ENV_REMOTE_KEY)) {
            let mut remote = RemoteConfig::new(&url, &key);
            if let Some(table) = get(ENV_REMOTE_TABLE) {
                remote = remote.table(&table);
            }
            if let Some(secs) = get(ENV_REMOTE_TIMEOUT_SECS) {
                let secs: u64 = secs.parse().map_err(|_| {
                    TrackerError::Config(format!("{ENV_REMOTE_TIMEOUT_SECS} must be a whole number"))
                })?;
                remote = remote.timeout(Duration::from_secs(secs));
            }
            config = config.remote(remote);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(TrackerError::Config("data_dir cannot be empty".into()));
        }
        if let Some(remote) = &self.remote {
            remote.validate()?;
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new("bosswatch_data")
    }
}
