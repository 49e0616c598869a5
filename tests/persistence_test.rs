// ==========================================
// Snapshot persistence & restore integration tests
// ==========================================
// AppState restart round trips, the background persister and
// corrupt-snapshot handling.
// ==========================================

mod helpers;

use fuel_dispatch::app::AppState;
use fuel_dispatch::domain::types::FuelType;
use fuel_dispatch::engine::DispatchError;
use fuel_dispatch::repository::SnapshotRepository;
use helpers::mock_config::MockConfig;
use rusqlite::Connection;
use std::time::Duration;
use test_helpers::{create_test_db, unload_plan};

async fn open_state(db_path: &str, config: &MockConfig) -> AppState {
    AppState::with_config_reader(db_path.to_string(), config)
        .await
        .unwrap()
}

fn ai95_level(state: &AppState, station_id: &str) -> f64 {
    state
        .station_api
        .get_station(station_id)
        .unwrap()
        .level(FuelType::Ai95)
        .unwrap()
        .current_l
}

#[tokio::test]
async fn test_restart_restores_fleet_stations_and_ledger() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let config = MockConfig::fast(10);

    {
        let state = open_state(&db_path, &config).await;
        assert!(state.seed_demo_data().unwrap());

        let truck = state.fleet_api.get_truck("t001").unwrap().truck;
        state
            .dispatch_api
            .dispatch("t001", unload_plan(&truck, &[("Белоруснефть АЗС №15", 15000)]))
            .unwrap();
        state.fleet_api.retire_truck("t005").unwrap();
        state.shutdown().await.unwrap();
        assert_eq!(ai95_level(&state, "s001"), 23000.0);
    }

    let state = open_state(&db_path, &config).await;
    assert_eq!(state.fleet_api.list_trucks().len(), 5);
    assert!(state.fleet_api.get_truck("t005").unwrap().truck.retired);
    assert_eq!(state.station_api.list_stations().len(), 4);
    assert_eq!(ai95_level(&state, "s001"), 23000.0);

    let ledger = state.dispatch_api.ledger(None);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].route, vec!["Белоруснефть АЗС №15".to_string()]);

    // Seeding never runs twice
    assert!(!state.seed_demo_data().unwrap());
}

#[tokio::test]
async fn test_persister_saves_after_delivery() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut config = MockConfig::fast(10);
    config.consumption_period_ms = 3_600_000;

    let state = open_state(&db_path, &config).await;
    state.seed_demo_data().unwrap();
    state.start_background();

    let truck = state.fleet_api.get_truck("t001").unwrap().truck;
    state
        .dispatch_api
        .dispatch("t001", unload_plan(&truck, &[("Белоруснефть АЗС №15", 1000)]))
        .unwrap();
    state.dispatch_api.wait_all().await;

    let repo = SnapshotRepository::new(&db_path).unwrap();
    let mut saved = 0;
    for _ in 0..200 {
        saved = repo.ledger_len().unwrap();
        if saved == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(saved, 1);

    let snapshot = repo.load().unwrap().unwrap();
    let s001 = snapshot.stations.iter().find(|s| s.id == "s001").unwrap();
    assert_eq!(s001.level(FuelType::Ai95).unwrap().current_l, 9000.0);

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_consumption_ticks_are_persisted() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut config = MockConfig::fast(10);
    config.consumption_step_l = 100.0;

    {
        let state = open_state(&db_path, &config).await;
        state.seed_demo_data().unwrap();
        state.start_background();
        tokio::time::sleep(Duration::from_millis(100)).await;
        state.shutdown().await.unwrap();
    }

    let state = open_state(&db_path, &config).await;
    assert!(ai95_level(&state, "s002") < 22000.0);
}

// ==========================================
// Corruption
// ==========================================

#[tokio::test]
async fn test_corrupt_snapshot_aborts_startup() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let config = MockConfig::default();
    {
        let state = open_state(&db_path, &config).await;
        state.seed_demo_data().unwrap();
    }

    let conn = Connection::open(&db_path).unwrap();
    conn.execute(
        "UPDATE fuel_level SET current_l = max_l + 1 WHERE station_id = 's002'",
        [],
    )
    .unwrap();
    drop(conn);

    let err = AppState::with_config_reader(db_path.clone(), &config)
        .await
        .err()
        .unwrap();
    assert!(err.contains("corrupt snapshot"));
}

#[tokio::test]
async fn test_unknown_stored_fuel_type_aborts_startup() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let config = MockConfig::default();
    {
        let state = open_state(&db_path, &config).await;
        state.seed_demo_data().unwrap();
    }

    let conn = Connection::open(&db_path).unwrap();
    conn.execute(
        "UPDATE fuel_level SET fuel_type = 'KEROSENE' WHERE station_id = 's001' AND seq = 0",
        [],
    )
    .unwrap();
    drop(conn);

    assert!(AppState::with_config_reader(db_path.clone(), &config)
        .await
        .is_err());
}

#[tokio::test]
async fn test_restore_rejects_corrupt_snapshot_and_keeps_state() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let state = open_state(&db_path, &MockConfig::default()).await;
    state.seed_demo_data().unwrap();

    let before = state.orchestrator.snapshot();
    let mut corrupt = before.clone();
    corrupt.stations[1].fuel_levels[0].min_l = corrupt.stations[1].fuel_levels[0].max_l;

    let err = state.orchestrator.restore(corrupt).unwrap_err();
    assert!(matches!(err, DispatchError::CorruptSnapshot(_)));
    assert_eq!(state.orchestrator.snapshot().stations, before.stations);
}

#[tokio::test]
async fn test_restore_rejects_duplicate_station_names() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let state = open_state(&db_path, &MockConfig::default()).await;
    state.seed_demo_data().unwrap();

    let mut twin_names = state.orchestrator.snapshot();
    twin_names.stations[1].name = twin_names.stations[0].name.clone();

    let err = state.orchestrator.restore(twin_names).unwrap_err();
    match err {
        DispatchError::CorruptSnapshot(msg) => assert!(msg.contains("duplicate station name")),
        other => panic!("Expected CorruptSnapshot, got {:?}", other),
    }
    assert_eq!(state.station_api.list_stations().len(), 4);
}

#[tokio::test]
async fn test_restored_shorter_ledger_survives_restart() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let config = MockConfig::fast(10);
    {
        let state = open_state(&db_path, &config).await;
        state.seed_demo_data().unwrap();
        let before = state.orchestrator.snapshot();

        let truck = state.fleet_api.get_truck("t001").unwrap().truck;
        state
            .dispatch_api
            .dispatch("t001", unload_plan(&truck, &[("Белоруснефть АЗС №15", 1000)]))
            .unwrap();
        state.dispatch_api.wait_all().await;
        state.persist_now().unwrap();

        state.orchestrator.restore(before).unwrap();
        state.persist_now().unwrap();
    }

    let state = open_state(&db_path, &config).await;
    assert!(state.dispatch_api.ledger(None).is_empty());
    assert_eq!(ai95_level(&state, "s001"), 8000.0);
}

#[tokio::test(start_paused = true)]
async fn test_restore_refused_while_dispatch_in_flight() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let state = open_state(&db_path, &MockConfig::default()).await;
    state.seed_demo_data().unwrap();

    let snapshot = state.orchestrator.snapshot();
    let truck = state.fleet_api.get_truck("t001").unwrap().truck;
    state
        .dispatch_api
        .dispatch("t001", unload_plan(&truck, &[("Белоруснефть АЗС №15", 1000)]))
        .unwrap();

    assert_eq!(
        state.orchestrator.restore(snapshot.clone()),
        Err(DispatchError::DispatchesInFlight(1))
    );

    state.dispatch_api.wait_all().await;
    state.orchestrator.restore(snapshot).unwrap();
    assert_eq!(ai95_level(&state, "s001"), 8000.0);
    assert!(state.dispatch_api.ledger(None).is_empty());
}
