use crate::config::BossRoster;
use crate::core::{EntityConfig, EntityRecord, GroupState};

/// Combines a canonical boss definition with whatever was loaded for it.
///
/// The respawn interval always comes from `config`; the kill timestamp comes
/// from `existing` when there is one.
pub fn merge_record(config: &EntityConfig, existing: Option<&EntityRecord>) -> EntityRecord {
    EntityRecord {
        name: config.name.clone(),
        respawn_minutes: config.respawn_minutes,
        last_killed: existing.and_then(|record| record.last_killed),
    }
}

/// Builds a state holding exactly the bosses of `roster`.
///
/// Entries of `loaded` that are not in the roster are dropped and roster
/// bosses missing from `loaded` start out never killed.
pub fn reconcile(roster: &BossRoster, loaded: &GroupState) -> GroupState {
    roster
        .iter()
        .map(|config| merge_record(config, loaded.get(&config.name)))
        .collect()
}
