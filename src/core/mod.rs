pub mod error;
pub mod types;

pub use error::{Result, TrackerError};
pub use types::{
    BossStatus, DerivedStatus, EntityConfig, EntityRecord, GroupState, TrackedBoss,
};
