//! Status engine: turns a record and the current instant into a live status.
//!
//! Everything here is pure. Callers poll (once per second in the CLI) and
//! recompute from scratch; no countdown state is stored anywhere.

pub mod time;

use chrono::{DateTime, FixedOffset, Utc};

use crate::core::{BossStatus, DerivedStatus, EntityRecord, GroupState, TrackedBoss};

pub use time::{
    DEFAULT_UTC_OFFSET_SECS, default_display_offset, format_timestamp, parse_kill_time,
    parse_utc_offset,
};

/// Derives the status of `record` at `now`, rendering times at UTC+8.
pub fn derive_status(record: &EntityRecord, now: DateTime<Utc>) -> DerivedStatus {
    derive_status_in(record, now, &default_display_offset())
}

/// Same as [`derive_status`] with an explicit display offset.
///
/// A boss is alive when it has no recorded kill or when its respawn instant
/// is at or before `now`; otherwise it is respawning and the countdown is the
/// whole number of seconds left.
pub fn derive_status_in(
    record: &EntityRecord,
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> DerivedStatus {
    let Some(respawn_at) = record.respawn_at() else {
        return DerivedStatus::alive();
    };

    if respawn_at <= now {
        return DerivedStatus::alive();
    }

    DerivedStatus {
        status: BossStatus::Respawning,
        time_until_respawn_secs: Some((respawn_at - now).num_seconds()),
        formatted_respawn_time: Some(format_timestamp(respawn_at, offset)),
    }
}

/// Statuses for every boss in `state`, ordered by boss name.
pub fn track_group(state: &GroupState, now: DateTime<Utc>, offset: &FixedOffset) -> Vec<TrackedBoss> {
    state
        .records()
        .map(|record| TrackedBoss {
            record: record.clone(),
            status: derive_status_in(record, now, offset),
        })
        .collect()
}

/// `HH:MM:SS`, zero padded. Negative input renders as zero.
pub fn format_countdown(seconds: i64) -> String {
    if seconds <= 0 {
        return "00:00:00".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// `"{h}h {m}m"`, e.g. `"2h 0m"` for 120 minutes.
pub fn format_respawn_interval(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

pub fn status_label(status: BossStatus) -> &'static str {
    match status {
        BossStatus::Alive => "存活",
        BossStatus::Dead => "死亡",
        BossStatus::Respawning => "重生中",
    }
}
