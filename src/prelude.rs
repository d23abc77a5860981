//! Recommended imports grouped by how much of the crate an application uses.
//!
//! `tracker` covers hosts that only load, record and display state.
//! `backends` adds the pieces needed to wire custom storage or remotes.

pub mod tracker {
    //! Load a group, record kills, render statuses.
    pub use crate::{
        BossStatus, Catalog, DerivedStatus, GroupState, TrackerConfig, TrackerService,
        derive_status, format_countdown, parse_kill_time, track_group,
    };
}

pub mod backends {
    //! Storage and remote seams.
    pub use crate::remote::{MemoryRemoteStore, PostgrestStore, RemoteRecord, RemoteStore};
    pub use crate::storage::{FileKvStore, KeyValueStore, LocalStore, MemoryKvStore, local_key};
}
