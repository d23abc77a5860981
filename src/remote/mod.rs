//! Shared remote table of boss records, one row per (group, boss).

pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{EntityRecord, Result};

pub use memory::MemoryRemoteStore;
pub use postgrest::PostgrestStore;

pub const DEFAULT_REMOTE_TABLE: &str = "boss_tracker_data";

/// Conflict key of the remote table.
pub const UPSERT_CONFLICT_KEY: &str = "group_name,boss_name";

/// Row of the remote table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub group_name: String,
    pub boss_name: String,
    pub respawn_minutes: u32,
    pub last_killed: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteRecord {
    pub fn from_entity(group: &str, record: &EntityRecord, updated_at: DateTime<Utc>) -> Self {
        Self {
            group_name: group.to_string(),
            boss_name: record.name.clone(),
            respawn_minutes: record.respawn_minutes,
            last_killed: record.last_killed,
            updated_at,
        }
    }

    pub fn to_entity(&self) -> EntityRecord {
        EntityRecord {
            name: self.boss_name.clone(),
            respawn_minutes: self.respawn_minutes,
            last_killed: self.last_killed,
        }
    }
}

/// Remote replica consumed by the tracker service.
///
/// An upsert on an existing `(group_name, boss_name)` replaces every column
/// of that row. Errors are reported but the service never treats them as fatal.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All records stored for `group`. An empty list is a valid answer.
    async fn fetch_group(&self, group: &str) -> Result<Vec<EntityRecord>>;

    async fn upsert_records(&self, records: &[RemoteRecord]) -> Result<()>;
}
