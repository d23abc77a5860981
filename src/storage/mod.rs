//! Local persistence: one JSON document per group in a key-value backend.

pub mod file;
pub mod memory;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{GroupState, Result};

pub use file::FileKvStore;
pub use memory::MemoryKvStore;

pub const LOCAL_KEY_PREFIX: &str = "boss-data-";

/// Synchronous string key-value backend (a directory of files, a browser-like
/// local storage, an in-memory map).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Storage key for a group's state.
pub fn local_key(group: &str) -> String {
    format!("{LOCAL_KEY_PREFIX}{group}")
}

/// JSON adapter over a [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Reads the stored state for `group`.
    ///
    /// Missing, unreadable and malformed data all come back as an empty
    /// state; the failure is logged and never reaches the caller.
    pub fn load(&self, group: &str) -> GroupState {
        let key = local_key(group);
        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "no local data");
                return GroupState::new();
            }
            Err(err) => {
                warn!(key = %key, error = %err, "failed to read local data");
                return GroupState::new();
            }
        };

        match serde_json::from_str::<GroupState>(&raw) {
            Ok(state) => state,
            Err(err) => {
                warn!(key = %key, error = %err, "discarding malformed local data");
                GroupState::new()
            }
        }
    }

    pub fn save(&self, group: &str, state: &GroupState) -> Result<()> {
        let key = local_key(group);
        let raw = serde_json::to_string(state)?;
        self.backend.set(&key, &raw)?;
        debug!(key = %key, bosses = state.len(), "saved local data");
        Ok(())
    }
}
