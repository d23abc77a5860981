/// Reconciliation service tests
///
/// Load/update behavior across local and remote stores, including the
/// degraded paths where either store misbehaves.
/// Run with: cargo test --test tracker_service_tests

use bosswatch::{
    BossRoster, BossStatus, Catalog, EntityConfig, EntityRecord, FileKvStore, GroupState,
    KeyValueStore, LocalStore, MemoryKvStore, MemoryRemoteStore, RemoteRecord, RemoteStore,
    TrackerConfig, TrackerError, TrackerService, derive_status,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn ts(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
}

fn alpha_roster() -> Arc<BossRoster> {
    Arc::new(BossRoster::new([EntityConfig::new("Alpha", 120)]).unwrap())
}

fn roster() -> Arc<BossRoster> {
    Arc::new(
        BossRoster::new([
            EntityConfig::new("Alpha", 120),
            EntityConfig::new("Beta", 60),
            EntityConfig::new("Gamma", 480),
        ])
        .unwrap(),
    )
}

fn remote_row(group: &str, boss: &str, minutes: u32, killed: Option<DateTime<Utc>>) -> RemoteRecord {
    RemoteRecord {
        group_name: group.to_string(),
        boss_name: boss.to_string(),
        respawn_minutes: minutes,
        last_killed: killed,
        updated_at: ts(0, 0),
    }
}

#[tokio::test]
async fn test_fresh_load_yields_roster_defaults() {
    let service = TrackerService::new("g1", alpha_roster(), LocalStore::in_memory());

    let state = service.load().await;

    let expected: GroupState = [EntityRecord::new("Alpha", 120)].into_iter().collect();
    assert_eq!(state, expected);
    assert_eq!(derive_status(state.get("Alpha").unwrap(), ts(0, 0)).status, BossStatus::Alive);
}

#[tokio::test]
async fn test_recorded_kill_counts_down() {
    let service = TrackerService::new("g1", alpha_roster(), LocalStore::in_memory());
    let state = service.load().await;

    let state = assert_ok!(service.update(&state, "Alpha", Some(ts(0, 0))).await);

    let status = derive_status(state.get("Alpha").unwrap(), ts(1, 0));
    assert_eq!(status.status, BossStatus::Respawning);
    assert_eq!(status.time_until_respawn_secs, Some(3600));
}

#[tokio::test]
async fn test_update_persists_locally_and_survives_reload() {
    let local = LocalStore::in_memory();
    let service = TrackerService::new("g1", roster(), local.clone());
    let state = service.load().await;

    let state = service.record_kill(&state, "Beta", ts(3, 0)).await.unwrap();
    assert_eq!(local.load("g1"), state);

    let reopened = TrackerService::new("g1", roster(), local);
    assert_eq!(reopened.load().await, state);
}

#[tokio::test]
async fn test_clear_resets_to_never_killed() {
    let service = TrackerService::new("g1", roster(), LocalStore::in_memory());
    let state = service.load().await;
    let killed = service.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();

    let cleared = service.clear(&killed, "Alpha").await.unwrap();

    assert_eq!(cleared.get("Alpha").unwrap().last_killed, None);
    assert_eq!(derive_status(cleared.get("Alpha").unwrap(), ts(0, 30)).status, BossStatus::Alive);
    assert_eq!(cleared, state);
}

#[tokio::test]
async fn test_update_does_not_touch_caller_snapshot() {
    let service = TrackerService::new("g1", roster(), LocalStore::in_memory());
    let state = service.load().await;

    let _ = service.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();

    assert_eq!(state.get("Alpha").unwrap().last_killed, None);
}

#[tokio::test]
async fn test_update_unknown_boss() {
    let service = TrackerService::new("g1", roster(), LocalStore::in_memory());
    let state = service.load().await;

    let err = assert_err!(service.record_kill(&state, "Nobody", ts(0, 0)).await);
    assert!(matches!(err, TrackerError::UnknownBoss(name) if name == "Nobody"));
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let backend = Arc::new(MemoryKvStore::new());
    let local = LocalStore::new(backend.clone());
    let stale: GroupState = [EntityRecord::new("Alpha", 7).killed_at(ts(0, 0))]
        .into_iter()
        .collect();
    local.save("g1", &stale).unwrap();

    let service = TrackerService::new("g1", roster(), local);
    let first = service.load().await;
    let second = service.load().await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_load_matches_roster_exactly() {
    let local = LocalStore::in_memory();
    let stored: GroupState = [
        EntityRecord::new("Alpha", 1).killed_at(ts(0, 0)),
        EntityRecord::new("Retired", 30).killed_at(ts(0, 0)),
    ]
    .into_iter()
    .collect();
    local.save("g1", &stored).unwrap();

    let service = TrackerService::new("g1", roster(), local.clone());
    let state = service.load().await;

    assert_eq!(state.names().collect::<Vec<_>>(), vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(state.get("Alpha").unwrap().respawn_minutes, 120);
    assert_eq!(state.get("Alpha").unwrap().last_killed, Some(ts(0, 0)));
    assert_eq!(state.get("Gamma").unwrap().last_killed, None);

    // The reconciled state replaces what was stored.
    assert_eq!(local.load("g1"), state);
}

#[tokio::test]
async fn test_corrupt_local_data_loads_defaults() {
    let backend = Arc::new(MemoryKvStore::new());
    backend.set("boss-data-g1", "\u{0}garbage").unwrap();

    let service = TrackerService::new("g1", roster(), LocalStore::new(backend.clone()));
    let state = service.load().await;

    assert_eq!(state.len(), 3);
    assert!(state.records().all(|record| record.last_killed.is_none()));
}

#[tokio::test]
async fn test_local_write_failure_is_not_fatal() {
    let backend = Arc::new(MemoryKvStore::new());
    backend.set_fail_writes(true);
    let service = TrackerService::new("g1", roster(), LocalStore::new(backend.clone()));

    let state = service.load().await;
    assert_eq!(state.len(), 3);

    let state = service.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();
    assert_eq!(state.get("Alpha").unwrap().last_killed, Some(ts(0, 0)));
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_groups_do_not_share_state() {
    let local = LocalStore::in_memory();
    let first = TrackerService::new("g1", roster(), local.clone());
    let second = TrackerService::new("g2", roster(), local.clone());

    let state = first.load().await;
    first.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();

    let other = second.load().await;
    assert_eq!(other.get("Alpha").unwrap().last_killed, None);
}

#[tokio::test]
async fn test_file_backed_service_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let local = LocalStore::new(Arc::new(FileKvStore::new(temp_dir.path())));

    let service = TrackerService::new("erika1", roster(), local);
    let state = service.load().await;
    let state = service.record_kill(&state, "Gamma", ts(5, 15)).await.unwrap();

    assert!(temp_dir.path().join("boss-data-erika1.json").exists());

    let reopened = TrackerService::new(
        "erika1",
        roster(),
        LocalStore::new(Arc::new(FileKvStore::new(temp_dir.path()))),
    );
    assert_eq!(reopened.load().await, state);
}

#[tokio::test]
async fn test_file_backed_groups_with_similar_keys_stay_apart() {
    let temp_dir = TempDir::new().unwrap();
    let open = |group: &str| {
        TrackerService::new(
            group,
            roster(),
            LocalStore::new(Arc::new(FileKvStore::new(temp_dir.path()))),
        )
    };

    let slashed = open("party/1");
    let state = slashed.load().await;
    slashed.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();

    for other in ["party_1", "party:1", "party%2F1"] {
        let state = open(other).load().await;
        assert_eq!(state.get("Alpha").unwrap().last_killed, None, "group {other}");
    }
    assert_eq!(
        open("party/1").load().await.get("Alpha").unwrap().last_killed,
        Some(ts(0, 0))
    );
}

#[tokio::test]
async fn test_from_config_stores_under_file_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Catalog::from_json_str(
        r#"{
            "groups": { "艾瑞卡1": { "name": "艾瑞卡1", "icon": "⚔️", "colorVar": "erika1", "filePrefix": "erika1" } },
            "bosses": { "Alpha": { "respawnMinutes": 120 } }
        }"#,
    )
    .unwrap();
    let config = TrackerConfig::new(temp_dir.path());

    let service = TrackerService::from_config(&config, &catalog, "艾瑞卡1").unwrap();
    assert_eq!(service.group(), "艾瑞卡1");
    assert_eq!(service.storage_key(), "erika1");

    let state = service.load().await;
    service.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();

    assert!(temp_dir.path().join("boss-data-erika1.json").exists());
    assert!(!temp_dir.path().join("boss-data-艾瑞卡1.json").exists());

    let Err(err) = TrackerService::from_config(&config, &catalog, "erika1") else {
        panic!("group keys are not storage keys");
    };
    assert!(matches!(err, TrackerError::UnknownGroup(_)));
}

// ============================================================================
// Remote replica
// ============================================================================

#[tokio::test]
async fn test_remote_data_takes_precedence_over_local() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote
        .upsert_records(&[remote_row("g1", "Alpha", 120, Some(ts(1, 0)))])
        .await
        .unwrap();

    let local = LocalStore::in_memory();
    let stale: GroupState = [EntityRecord::new("Alpha", 120).killed_at(ts(0, 0))]
        .into_iter()
        .collect();
    local.save("g1", &stale).unwrap();

    let service = TrackerService::new("g1", roster(), local.clone()).with_remote(remote.clone());
    let state = service.load().await;

    assert_eq!(state.get("Alpha").unwrap().last_killed, Some(ts(1, 0)));
    assert_eq!(local.load("g1"), state);
    assert!(service.flush().await);
}

#[tokio::test]
async fn test_remote_fetch_failure_falls_back_to_local() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_fail_fetch(true);

    let local = LocalStore::in_memory();
    let stored: GroupState = [EntityRecord::new("Beta", 60).killed_at(ts(2, 0))]
        .into_iter()
        .collect();
    local.save("g1", &stored).unwrap();

    let service = TrackerService::new("g1", roster(), local).with_remote(remote.clone());
    let state = service.load().await;

    assert_eq!(state.len(), 3);
    assert_eq!(state.get("Beta").unwrap().last_killed, Some(ts(2, 0)));

    // The reconciled local copy is still pushed to the remote.
    assert!(service.flush().await);
    assert_eq!(
        remote.row("g1", "Beta").await.unwrap().last_killed,
        Some(ts(2, 0))
    );
}

#[tokio::test]
async fn test_empty_remote_answer_is_authoritative() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let local = LocalStore::in_memory();
    let stored: GroupState = [EntityRecord::new("Beta", 60).killed_at(ts(2, 0))]
        .into_iter()
        .collect();
    local.save("g1", &stored).unwrap();

    let service = TrackerService::new("g1", roster(), local).with_remote(remote);
    let state = service.load().await;

    assert!(state.records().all(|record| record.last_killed.is_none()));
}

#[tokio::test]
async fn test_load_repairs_remote_intervals() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote
        .upsert_records(&[
            remote_row("g1", "Alpha", 5, Some(ts(0, 0))),
            remote_row("g1", "Retired", 30, None),
        ])
        .await
        .unwrap();

    let service = TrackerService::new("g1", roster(), LocalStore::in_memory())
        .with_remote(remote.clone());
    let state = service.load().await;
    assert!(!state.contains("Retired"));
    assert!(service.flush().await);

    let alpha = remote.row("g1", "Alpha").await.unwrap();
    assert_eq!(alpha.respawn_minutes, 120);
    assert_eq!(alpha.last_killed, Some(ts(0, 0)));
    assert!(remote.row("g1", "Gamma").await.is_some());
    // Upserts never delete rows.
    assert!(remote.row("g1", "Retired").await.is_some());
}

#[tokio::test]
async fn test_every_update_upserts_the_full_group() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = TrackerService::new("g1", roster(), LocalStore::in_memory())
        .with_remote(remote.clone());

    let state = service.load().await;
    assert!(service.flush().await);
    assert_eq!(remote.upsert_count(), 1);

    service.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();
    assert!(service.flush().await);

    assert_eq!(remote.upsert_count(), 2);
    let rows = remote.rows("g1").await;
    assert_eq!(rows.len(), 3);
    let updated_at = rows[0].updated_at;
    assert!(rows.iter().all(|row| row.updated_at == updated_at));
}

#[tokio::test]
async fn test_upsert_failure_keeps_local_write() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let local = LocalStore::in_memory();
    let service = TrackerService::new("g1", roster(), local.clone()).with_remote(remote.clone());

    let state = service.load().await;
    assert!(service.flush().await);

    remote.set_fail_upsert(true);
    let state = assert_ok!(service.record_kill(&state, "Alpha", ts(0, 0)).await);
    assert!(!service.flush().await);

    assert_eq!(local.load("g1").get("Alpha").unwrap().last_killed, Some(ts(0, 0)));
    assert_eq!(remote.row("g1", "Alpha").await.unwrap().last_killed, None);

    // The slot is released after the failure, so the next sync goes through.
    remote.set_fail_upsert(false);
    service.record_kill(&state, "Beta", ts(0, 5)).await.unwrap();
    assert!(service.flush().await);
    let alpha = remote.row("g1", "Alpha").await.unwrap();
    assert_eq!(alpha.last_killed, Some(ts(0, 0)));
}

#[tokio::test]
async fn test_save_reports_sync_result() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let service = TrackerService::new("g1", roster(), LocalStore::in_memory())
        .with_remote(remote.clone());
    let state = service.load().await;

    assert!(service.save(&state).await);

    remote.set_fail_upsert(true);
    assert!(!service.save(&state).await);

    let local_only = TrackerService::new("g1", roster(), LocalStore::in_memory());
    assert!(local_only.save(&state).await);
}

#[tokio::test]
async fn test_clients_share_state_through_remote() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let first = TrackerService::new("g1", roster(), LocalStore::in_memory())
        .with_remote(remote.clone());
    let second = TrackerService::new("g1", roster(), LocalStore::in_memory())
        .with_remote(remote.clone());

    let state = first.load().await;
    first.record_kill(&state, "Gamma", ts(4, 0)).await.unwrap();
    assert!(first.flush().await);

    let seen = second.load().await;
    assert_eq!(seen.get("Gamma").unwrap().last_killed, Some(ts(4, 0)));
}

#[tokio::test]
async fn test_storage_key_only_affects_local_data() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let local = LocalStore::in_memory();
    let service = TrackerService::new("艾瑞卡1", roster(), local.clone())
        .with_storage_key("erika1")
        .with_remote(remote.clone());

    let state = service.load().await;
    let state = service.record_kill(&state, "Alpha", ts(0, 0)).await.unwrap();
    assert!(service.flush().await);

    assert_eq!(local.load("erika1"), state);
    assert!(local.load("艾瑞卡1").is_empty());
    assert_eq!(remote.rows("艾瑞卡1").await.len(), 3);
    assert!(remote.rows("erika1").await.is_empty());
}
