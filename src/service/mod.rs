//! Reconciliation service: the single entry point for reading and writing a
//! group's boss state.
//!
//! Local storage is written synchronously on every load and update and is
//! the durable copy from the caller's point of view. The remote store, when
//! configured, is a best-effort replica: syncs run in the background, one at
//! a time per service, in the order they were requested.

pub mod reconcile;
pub mod sync;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{BossRoster, Catalog, TrackerConfig};
use crate::core::{GroupState, Result};
use crate::remote::{PostgrestStore, RemoteRecord, RemoteStore};
use crate::storage::{FileKvStore, LocalStore};

pub use reconcile::{merge_record, reconcile};
pub use sync::{SlotRelease, SyncHandle, SyncSlot};

/// Reconciling tracker for one group
///
/// Loads state from the remote replica (or local storage), reconciles it with
/// the canonical roster, and keeps local and remote copies up to date.
///
/// # Examples
///
/// ```
/// use bosswatch::{BossRoster, EntityConfig, LocalStore, TrackerService, derive_status};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let roster = BossRoster::new([EntityConfig::new("Alpha", 120)])?;
/// let service = TrackerService::new("erika1", Arc::new(roster), LocalStore::in_memory());
///
/// let runtime = tokio::runtime::Runtime::new()?;
/// let state = runtime.block_on(service.load());
///
/// let now = chrono::Utc::now();
/// let state = runtime.block_on(service.record_kill(&state, "Alpha", now))?;
///
/// let status = derive_status(state.get("Alpha").unwrap(), now);
/// assert!(status.is_respawning());
/// # Ok(())
/// # }
/// ```
pub struct TrackerService {
    group: String,
    storage_key: String,
    roster: Arc<BossRoster>,
    local: LocalStore,
    remote: Option<Arc<dyn RemoteStore>>,
    sync: SyncSlot,
}

impl TrackerService {
    pub fn new(group: impl Into<String>, roster: Arc<BossRoster>, local: LocalStore) -> Self {
        let group = group.into();
        Self {
            storage_key: group.clone(),
            group,
            roster,
            local,
            remote: None,
            sync: SyncSlot::new(),
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Keeps local data under `key` instead of the group name.
    ///
    /// The remote store is still partitioned by the group name.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// File-backed service for `group`, replicating to the configured remote.
    ///
    /// Local data is stored under the group's `filePrefix` when it has one.
    pub fn from_config(config: &TrackerConfig, catalog: &Catalog, group: &str) -> Result<Self> {
        let storage_key = catalog.storage_key(group)?;

        let local = LocalStore::new(Arc::new(FileKvStore::new(&config.data_dir)));
        let service = Self::new(group, catalog.roster(), local).with_storage_key(storage_key);

        match &config.remote {
            Some(remote) => Ok(service.with_remote(Arc::new(PostgrestStore::new(remote)?))),
            None => Ok(service),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Loads the group, reconciled against the canonical roster.
    ///
    /// Reads the remote when one is configured, falling back to local data if
    /// the fetch fails. The result always holds exactly the roster's bosses;
    /// it is written back locally and queued for remote sync.
    pub async fn load(&self) -> GroupState {
        let loaded = match &self.remote {
            Some(remote) => match remote.fetch_group(&self.group).await {
                Ok(records) => records.into_iter().collect(),
                Err(err) => {
                    warn!(
                        group = %self.group,
                        error = %err,
                        "remote fetch failed, falling back to local data"
                    );
                    self.local.load(&self.storage_key)
                }
            },
            None => self.local.load(&self.storage_key),
        };

        let state = reconcile(&self.roster, &loaded);
        self.persist_local(&state);
        self.spawn_sync(&state);
        state
    }

    /// Replaces `boss`'s kill timestamp and returns the new state.
    ///
    /// `None` clears the record. Only an unknown boss name is an error;
    /// storage and remote faults are logged and absorbed.
    pub async fn update(
        &self,
        state: &GroupState,
        boss: &str,
        last_killed: Option<DateTime<Utc>>,
    ) -> Result<GroupState> {
        let next = state.with_last_killed(boss, last_killed)?;
        self.persist_local(&next);
        self.spawn_sync(&next);
        Ok(next)
    }

    pub async fn record_kill(
        &self,
        state: &GroupState,
        boss: &str,
        at: DateTime<Utc>,
    ) -> Result<GroupState> {
        self.update(state, boss, Some(at)).await
    }

    pub async fn clear(&self, state: &GroupState, boss: &str) -> Result<GroupState> {
        self.update(state, boss, None).await
    }

    /// Persists `state` locally and waits for its remote sync.
    ///
    /// Returns the sync result, or `true` when no remote is configured.
    pub async fn save(&self, state: &GroupState) -> bool {
        self.persist_local(state);
        match self.spawn_sync(state) {
            Some(task) => task.await.unwrap_or_else(|err| {
                error!(group = %self.group, error = %err, "sync task failed");
                false
            }),
            None => true,
        }
    }

    /// Waits for every queued sync and returns the result of the last one.
    ///
    /// Returns `true` straight away when nothing is queued.
    pub async fn flush(&self) -> bool {
        match self.sync.current() {
            Some(handle) => handle.await,
            None => true,
        }
    }

    fn persist_local(&self, state: &GroupState) {
        if let Err(err) = self.local.save(&self.storage_key, state) {
            warn!(group = %self.group, error = %err, "failed to save local data");
        }
    }

    fn spawn_sync(&self, state: &GroupState) -> Option<JoinHandle<bool>> {
        let remote = self.remote.clone()?;
        let operation = perform_sync(remote, self.group.clone(), state.clone());
        let (handle, release) = self.sync.enqueue(operation);

        Some(tokio::spawn(async move {
            let _release = release;
            handle.await
        }))
    }
}

/// Upserts every record of `state`, not only the one that changed.
async fn perform_sync(remote: Arc<dyn RemoteStore>, group: String, state: GroupState) -> bool {
    let updated_at = Utc::now();
    let records: Vec<RemoteRecord> = state
        .records()
        .map(|record| RemoteRecord::from_entity(&group, record, updated_at))
        .collect();

    if records.is_empty() {
        return true;
    }

    match remote.upsert_records(&records).await {
        Ok(()) => {
            info!(group = %group, bosses = records.len(), "synced bosses to remote");
            true
        }
        Err(err) => {
            error!(group = %group, error = %err, "failed to sync to remote");
            false
        }
    }
}
