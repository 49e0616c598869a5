// ==========================================
// Dispatch lifecycle integration tests
// ==========================================
// Delivery, rejection and busy-truck scenarios against the
// orchestrator, driven on tokio's paused clock.
// ==========================================


use fuel_dispatch::domain::route_plan::RouteStep;
use fuel_dispatch::domain::types::{FuelType, TruckStatus};
use fuel_dispatch::engine::{
    BroadcastPublisher, DispatchError, DispatchEvent, DispatchOrchestrator, NoOpEventPublisher,
};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{ai95_station, ai95_truck, default_timings, unload_plan};
use tokio::time::sleep;

fn orchestrator() -> DispatchOrchestrator {
    let orch = DispatchOrchestrator::new(default_timings(), Arc::new(NoOpEventPublisher));
    orch.register_truck(ai95_truck("t001", 30000.0)).unwrap();
    orch.register_station(ai95_station("s001", "АЗС №15", 8000.0))
        .unwrap();
    orch
}

fn ai95_level(orch: &DispatchOrchestrator, station_id: &str) -> f64 {
    orch.station(station_id)
        .unwrap()
        .level(FuelType::Ai95)
        .unwrap()
        .current_l
}

// ==========================================
// Delivery
// ==========================================

#[tokio::test(start_paused = true)]
async fn test_delivery_raises_stock_and_records_one_entry() {
    let orch = orchestrator();
    let truck = ai95_truck("t001", 30000.0);

    let ticket = orch
        .dispatch("t001", unload_plan(&truck, &[("АЗС №15", 15000)]))
        .unwrap();
    assert_eq!(ticket.status, TruckStatus::EnRoute);
    assert_eq!(ticket.planned_unload_l, 15000.0);

    let report = orch.wait_for(&ticket.dispatch_id).await.unwrap();
    assert_eq!(report.delivered_l(), 15000.0);
    assert_eq!(report.spilled_l(), 0.0);
    assert_eq!(ai95_level(&orch, "s001"), 23000.0);

    let ledger = orch.ledger();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].total_volume_l, 15000.0);
    assert_eq!(ledger[0].fuel_type, FuelType::Ai95);
    assert_eq!(ledger[0].route, vec!["АЗС №15".to_string()]);
    assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_status_follows_phase_timers() {
    let orch = orchestrator();
    let truck = ai95_truck("t001", 30000.0);
    orch.dispatch("t001", unload_plan(&truck, &[("АЗС №15", 15000)]))
        .unwrap();

    // Outbound 0..5s
    sleep(Duration::from_millis(4_900)).await;
    assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::EnRoute);

    // Unloading 5..8s, nothing delivered yet
    sleep(Duration::from_millis(200)).await;
    assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::Unloading);
    assert_eq!(ai95_level(&orch, "s001"), 8000.0);
    assert!(orch.ledger().is_empty());

    // Returning 8..13s, delivery committed
    sleep(Duration::from_millis(3_000)).await;
    assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::EnRoute);
    assert_eq!(ai95_level(&orch, "s001"), 23000.0);
    assert_eq!(orch.ledger().len(), 1);

    // Loading 13..16s
    sleep(Duration::from_millis(5_000)).await;
    assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::Loading);

    sleep(Duration::from_millis(3_000)).await;
    assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::Idle);
    assert!(orch.active_dispatches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_overflow_is_clipped_and_reported() {
    let orch = orchestrator();
    let truck = ai95_truck("t001", 30000.0);

    let ticket = orch
        .dispatch("t001", unload_plan(&truck, &[("АЗС №15", 30000)]))
        .unwrap();
    let report = orch.wait_for(&ticket.dispatch_id).await.unwrap();

    assert_eq!(ai95_level(&orch, "s001"), 38000.0);
    assert_eq!(report.delivered_l(), 30000.0);
    assert_eq!(report.spilled_l(), 0.0);

    let truck2 = ai95_truck("t002", 30000.0);
    orch.register_truck(truck2.clone()).unwrap();
    let ticket = orch
        .dispatch("t002", unload_plan(&truck2, &[("АЗС №15", 5000)]))
        .unwrap();
    let report = orch.wait_for(&ticket.dispatch_id).await.unwrap();

    // 38000 + 5000 against a 40000 tank
    assert_eq!(report.delivered_l(), 2000.0);
    assert_eq!(report.spilled_l(), 3000.0);
    assert_eq!(ai95_level(&orch, "s001"), 40000.0);
}

#[tokio::test(start_paused = true)]
async fn test_finished_dispatches_release_their_tasks() {
    let orch = orchestrator();
    for id in ["t002", "t003"] {
        orch.register_truck(ai95_truck(id, 30000.0)).unwrap();
    }
    for id in ["t001", "t002", "t003"] {
        let truck = ai95_truck(id, 30000.0);
        orch.dispatch(id, unload_plan(&truck, &[("АЗС №15", 1000)]))
            .unwrap();
    }
    assert_eq!(orch.pending_tasks(), 3);

    // Whole cycle is 16s
    sleep(Duration::from_secs(20)).await;
    tokio::task::yield_now().await;

    assert!(orch.active_dispatches().is_empty());
    assert_eq!(orch.pending_tasks(), 0);
    assert_eq!(orch.ledger().len(), 3);
    assert!(orch.wait_all().await.is_empty());
}

// ==========================================
// Rejections
// ==========================================

#[tokio::test(start_paused = true)]
async fn test_over_capacity_plan_rejected_without_side_effects() {
    let orch = orchestrator();
    let small = ai95_truck("t002", 20000.0);
    orch.register_truck(small.clone()).unwrap();

    let err = orch
        .dispatch("t002", unload_plan(&small, &[("АЗС №15", 25000)]))
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidPlan { .. }));

    assert_eq!(orch.truck_status("t002").unwrap(), TruckStatus::Idle);
    assert!(orch.active_dispatches().is_empty());
    assert!(orch.ledger().is_empty());
    assert_eq!(ai95_level(&orch, "s001"), 8000.0);
}

#[tokio::test(start_paused = true)]
async fn test_second_dispatch_for_busy_truck_rejected() {
    let orch = orchestrator();
    let truck = ai95_truck("t001", 30000.0);

    orch.dispatch("t001", unload_plan(&truck, &[("АЗС №15", 10000)]))
        .unwrap();
    let err = orch
        .dispatch("t001", unload_plan(&truck, &[("АЗС №15", 5000)]))
        .unwrap_err();
    match err {
        DispatchError::TruckBusy { truck_id, status } => {
            assert_eq!(truck_id, "t001");
            assert_eq!(status, TruckStatus::EnRoute);
        }
        other => panic!("Expected TruckBusy, got {:?}", other),
    }

    let reports = orch.wait_all().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(orch.ledger().len(), 1);
    assert_eq!(ai95_level(&orch, "s001"), 18000.0);
}

#[tokio::test(start_paused = true)]
async fn test_retired_and_unknown_trucks_rejected() {
    let orch = orchestrator();
    let truck = ai95_truck("t001", 30000.0);

    let err = orch
        .dispatch("t404", unload_plan(&truck, &[("АЗС №15", 1000)]))
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound { .. }));

    orch.retire_truck("t001").unwrap();
    let err = orch
        .dispatch("t001", unload_plan(&truck, &[("АЗС №15", 1000)]))
        .unwrap_err();
    assert_eq!(err, DispatchError::TruckRetired("t001".to_string()));
    assert_eq!(orch.trucks().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_truck_edit_refused_while_dispatched() {
    let orch = orchestrator();
    let truck = ai95_truck("t001", 30000.0);
    orch.dispatch("t001", unload_plan(&truck, &[("АЗС №15", 1000)]))
        .unwrap();

    let mut edited = truck.clone();
    edited.driver = "Петров П.П.".to_string();
    assert!(matches!(
        orch.update_truck(edited.clone()),
        Err(DispatchError::TruckBusy { .. })
    ));

    orch.wait_all().await;
    let updated = orch.update_truck(edited).unwrap();
    assert_eq!(updated.driver, "Петров П.П.");
}

// ==========================================
// Skipped steps
// ==========================================

#[tokio::test(start_paused = true)]
async fn test_informational_step_ignored_rest_applied() {
    let orch = orchestrator();
    orch.register_station(ai95_station("s002", "АЗС №14", 20000.0))
        .unwrap();
    let truck = ai95_truck("t001", 30000.0);

    let mut plan = unload_plan(&truck, &[("АЗС №15", 5000), ("АЗС №14", 5000)]);
    plan.route[1].action = "Проверить колонки".to_string();

    let ticket = orch.dispatch("t001", plan).unwrap();
    assert_eq!(ticket.planned_unload_l, 5000.0);
    let report = orch.wait_for(&ticket.dispatch_id).await.unwrap();

    assert_eq!(ai95_level(&orch, "s001"), 8000.0);
    assert_eq!(ai95_level(&orch, "s002"), 25000.0);
    assert!(report.skipped.is_empty());

    // Both stations were visited
    let entry = report.entry.unwrap();
    assert_eq!(entry.route, vec!["АЗС №15".to_string(), "АЗС №14".to_string()]);
    assert_eq!(entry.delivered_volume_l, 5000.0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_fuel_label_skipped_rest_applied() {
    let orch = orchestrator();
    orch.register_station(ai95_station("s002", "АЗС №14", 20000.0))
        .unwrap();
    let truck = ai95_truck("t001", 30000.0);

    let mut plan = unload_plan(&truck, &[("АЗС №15", 5000), ("АЗС №14", 5000)]);
    plan.route[1].action = "Unload 5000L Gasoline".to_string();

    let ticket = orch.dispatch("t001", plan).unwrap();
    assert_eq!(ticket.planned_unload_l, 5000.0);
    let report = orch.wait_for(&ticket.dispatch_id).await.unwrap();

    assert_eq!(ai95_level(&orch, "s001"), 8000.0);
    assert_eq!(ai95_level(&orch, "s002"), 25000.0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].station_name, "АЗС №15");

    let entry = &orch.ledger()[0];
    assert_eq!(entry.delivered_volume_l, 5000.0);
    assert_eq!(entry.skipped, report.skipped);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_station_skipped_and_logged() {
    let publisher = Arc::new(BroadcastPublisher::default());
    let mut events = publisher.subscribe();
    let orch = DispatchOrchestrator::new(default_timings(), publisher.clone());
    orch.register_truck(ai95_truck("t001", 30000.0)).unwrap();
    orch.register_station(ai95_station("s001", "АЗС №15", 8000.0))
        .unwrap();
    let truck = ai95_truck("t001", 30000.0);

    let mut plan = unload_plan(&truck, &[("АЗС №15", 5000), ("АЗС №99", 5000)]);
    plan.route.insert(
        3,
        RouteStep::station("Проверить документы", "АЗС №15", (54.32, 29.15)),
    );

    let ticket = orch.dispatch("t001", plan).unwrap();
    let report = orch.wait_for(&ticket.dispatch_id).await.unwrap();

    assert_eq!(ai95_level(&orch, "s001"), 13000.0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].station_name, "АЗС №99");

    let entry = &orch.ledger()[0];
    assert!(entry.is_partial());
    assert_eq!(entry.total_volume_l, 10000.0);
    assert_eq!(entry.delivered_volume_l, 5000.0);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DispatchEvent::StepSkipped { station_name, .. } = &event {
            assert_eq!(station_name, "АЗС №99");
        }
        kinds.push(event.as_str());
    }
    assert_eq!(
        kinds,
        vec![
            "Accepted",
            "PhaseChanged",
            "StepSkipped",
            "DeliveryCompleted",
            "PhaseChanged",
            "PhaseChanged",
            "Released"
        ]
    );
}
