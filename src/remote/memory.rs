use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::core::{EntityRecord, Result, TrackerError};

use super::{RemoteRecord, RemoteStore};

type RowKey = (String, String);

/// In-process remote table with the same upsert contract as the HTTP store.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    rows: RwLock<BTreeMap<RowKey, RemoteRecord>>,
    fail_fetch: AtomicBool,
    fail_upsert: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    /// Number of successful upsert calls.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub async fn rows(&self, group: &str) -> Vec<RemoteRecord> {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| row.group_name == group)
            .cloned()
            .collect()
    }

    pub async fn row(&self, group: &str, boss: &str) -> Option<RemoteRecord> {
        self.rows
            .read()
            .await
            .get(&(group.to_string(), boss.to_string()))
            .cloned()
    }

    async fn write_rows(&self, records: &[RemoteRecord]) {
        let mut rows = self.rows.write().await;
        for record in records {
            rows.insert(
                (record.group_name.clone(), record.boss_name.clone()),
                record.clone(),
            );
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_group(&self, group: &str) -> Result<Vec<EntityRecord>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(TrackerError::Remote("fetch failed: remote unavailable".into()));
        }
        Ok(self
            .rows(group)
            .await
            .iter()
            .map(RemoteRecord::to_entity)
            .collect())
    }

    async fn upsert_records(&self, records: &[RemoteRecord]) -> Result<()> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(TrackerError::Remote("upsert failed: remote unavailable".into()));
        }
        self.write_rows(records).await;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
