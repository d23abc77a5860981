use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

use super::error::{Result, TrackerError};

/// Canonical definition of a boss: its name and how long it stays down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    #[serde(default)]
    pub name: String,
    pub respawn_minutes: u32,
}

impl EntityConfig {
    pub fn new(name: impl Into<String>, respawn_minutes: u32) -> Self {
        Self {
            name: name.into(),
            respawn_minutes,
        }
    }
}

/// Persisted per-boss state for one group.
///
/// `respawn_minutes` is carried for the remote table and the local JSON
/// layout but is overwritten from canonical configuration on every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub respawn_minutes: u32,
    #[serde(default)]
    pub last_killed: Option<DateTime<Utc>>,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, respawn_minutes: u32) -> Self {
        Self {
            name: name.into(),
            respawn_minutes,
            last_killed: None,
        }
    }

    pub fn killed_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_killed = Some(at);
        self
    }

    /// Instant the boss becomes available again, if it has a recorded kill.
    pub fn respawn_at(&self) -> Option<DateTime<Utc>> {
        self.last_killed
            .map(|killed| killed + chrono::Duration::minutes(i64::from(self.respawn_minutes)))
    }
}

impl From<&EntityConfig> for EntityRecord {
    fn from(config: &EntityConfig) -> Self {
        Self::new(config.name.clone(), config.respawn_minutes)
    }
}

/// All boss records of a single group, keyed by boss name.
///
/// Treat a `GroupState` handed out by the service as an immutable snapshot;
/// every mutation goes through [`crate::TrackerService`] and yields a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupState {
    records: BTreeMap<String, EntityRecord>,
}

impl GroupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, EntityRecord> {
        self.records.iter()
    }

    /// Inserts `record` under `name`, replacing any previous record.
    pub fn insert(&mut self, name: impl Into<String>, record: EntityRecord) {
        self.records.insert(name.into(), record);
    }

    /// Returns a copy of this state with `name`'s kill timestamp replaced.
    ///
    /// `None` clears the record, which is the same as never having been killed.
    pub fn with_last_killed(&self, name: &str, last_killed: Option<DateTime<Utc>>) -> Result<Self> {
        let mut next = self.clone();
        let record = next
            .records
            .get_mut(name)
            .ok_or_else(|| TrackerError::UnknownBoss(name.to_string()))?;
        record.last_killed = last_killed;
        Ok(next)
    }
}

impl FromIterator<EntityRecord> for GroupState {
    fn from_iter<I: IntoIterator<Item = EntityRecord>>(iter: I) -> Self {
        Self {
            records: iter
                .into_iter()
                .map(|record| (record.name.clone(), record))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a GroupState {
    type Item = (&'a String, &'a EntityRecord);
    type IntoIter = btree_map::Iter<'a, String, EntityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BossStatus {
    Alive,
    /// Reserved; never produced by the status engine.
    Dead,
    Respawning,
}

/// Live, never-persisted view of a record at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStatus {
    pub status: BossStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_respawn_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_respawn_time: Option<String>,
}

impl DerivedStatus {
    pub fn alive() -> Self {
        Self {
            status: BossStatus::Alive,
            time_until_respawn_secs: None,
            formatted_respawn_time: None,
        }
    }

    pub fn is_respawning(&self) -> bool {
        self.status == BossStatus::Respawning
    }
}

/// A record paired with its status, as shown by a refresh tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedBoss {
    #[serde(flatten)]
    pub record: EntityRecord,
    #[serde(flatten)]
    pub status: DerivedStatus,
}
