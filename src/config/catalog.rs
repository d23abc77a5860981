//! Canonical configuration supplied by the host: the groups that can be
//! tracked and the respawn interval of every boss.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::core::{EntityConfig, Result, TrackerError};

/// Display metadata of a group (a server or party).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color_var: String,
    /// Local storage partition; the group key is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
}

impl GroupConfig {
    /// Local storage partition of the group registered under `key`.
    pub fn storage_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.file_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(key)
    }
}

/// Canonical respawn intervals keyed by boss name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BossRoster {
    bosses: BTreeMap<String, EntityConfig>,
}

impl BossRoster {
    pub fn new<I>(configs: I) -> Result<Self>
    where
        I: IntoIterator<Item = EntityConfig>,
    {
        let mut bosses = BTreeMap::new();
        for config in configs {
            if config.name.trim().is_empty() {
                return Err(TrackerError::Config("boss name cannot be empty".into()));
            }
            if config.respawn_minutes == 0 {
                return Err(TrackerError::Config(format!(
                    "boss '{}' must have respawnMinutes > 0",
                    config.name
                )));
            }
            if bosses.insert(config.name.clone(), config).is_some() {
                return Err(TrackerError::Config("duplicate boss name in roster".into()));
            }
        }
        Ok(Self { bosses })
    }

    pub fn get(&self, name: &str) -> Option<&EntityConfig> {
        self.bosses.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityConfig> {
        self.bosses.values()
    }

    pub fn len(&self) -> usize {
        self.bosses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bosses.is_empty()
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    groups: BTreeMap<String, GroupConfig>,
    bosses: BTreeMap<String, EntityConfig>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    groups: BTreeMap<String, GroupConfig>,
    roster: Arc<BossRoster>,
}

impl Catalog {
    pub fn new(groups: BTreeMap<String, GroupConfig>, roster: BossRoster) -> Result<Self> {
        if roster.is_empty() {
            return Err(TrackerError::Config("catalog must define at least one boss".into()));
        }

        {
            let mut partitions: BTreeMap<&str, &str> = BTreeMap::new();
            for (key, group) in &groups {
                if let Some(other) = partitions.insert(group.storage_key(key), key.as_str()) {
                    return Err(TrackerError::Config(format!(
                        "groups '{other}' and '{key}' share the storage key '{}'",
                        group.storage_key(key)
                    )));
                }
            }
        }

        Ok(Self {
            groups,
            roster: Arc::new(roster),
        })
    }

    /// Parses the catalog JSON layout:
    ///
    /// ```json
    /// {
    ///   "groups": { "艾瑞卡1": { "name": "艾瑞卡1", "icon": "⚔️", "colorVar": "erika1", "filePrefix": "erika1" } },
    ///   "bosses": { "Alpha": { "respawnMinutes": 120 } }
    /// }
    /// ```
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)
            .map_err(|e| TrackerError::Config(format!("invalid catalog: {e}")))?;

        let roster = BossRoster::new(file.bosses.into_iter().map(|(name, config)| EntityConfig {
            name,
            respawn_minutes: config.respawn_minutes,
        }))?;

        Self::new(file.groups, roster)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!("Failed to read catalog '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn group(&self, key: &str) -> Result<&GroupConfig> {
        self.groups
            .get(key)
            .ok_or_else(|| TrackerError::UnknownGroup(key.to_string()))
    }

    /// Local storage partition of group `key`: its `filePrefix`, or the key itself.
    pub fn storage_key<'a>(&'a self, key: &'a str) -> Result<&'a str> {
        Ok(self.group(key)?.storage_key(key))
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &GroupConfig)> {
        self.groups.iter().map(|(key, group)| (key.as_str(), group))
    }

    pub fn boss(&self, name: &str) -> Result<&EntityConfig> {
        self.roster
            .get(name)
            .ok_or_else(|| TrackerError::UnknownBoss(name.to_string()))
    }

    pub fn roster(&self) -> Arc<BossRoster> {
        Arc::clone(&self.roster)
    }
}
