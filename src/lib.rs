// ============================================================================
// BossWatch Library
// ============================================================================

pub mod core;
pub mod config;
pub mod status;
pub mod storage;
pub mod remote;
pub mod service;
pub mod prelude;

// Re-export main types for convenience
pub use core::{
    BossStatus, DerivedStatus, EntityConfig, EntityRecord, GroupState, Result, TrackedBoss,
    TrackerError,
};
pub use config::{BossRoster, Catalog, GroupConfig, RemoteConfig, TrackerConfig};
pub use status::{
    derive_status, derive_status_in, format_countdown, format_respawn_interval, format_timestamp,
    parse_kill_time, status_label, track_group,
};
pub use storage::{FileKvStore, KeyValueStore, LocalStore, MemoryKvStore};
pub use remote::{MemoryRemoteStore, PostgrestStore, RemoteRecord, RemoteStore};

// ============================================================================
// Tracker Service
// ============================================================================

pub use service::TrackerService;
