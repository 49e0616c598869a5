// ==========================================
// HTTP route planner integration tests
// ==========================================
// Planning service stubbed with mockito.
// ==========================================


use fuel_dispatch::app::seed::{demo_stations, demo_trucks};
use fuel_dispatch::domain::types::{FuelType, TruckStatus};
use fuel_dispatch::engine::{
    DispatchError, DispatchOrchestrator, HttpRoutePlanner, NoOpEventPublisher,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::fast_timings;

fn seeded_orchestrator() -> DispatchOrchestrator {
    let orch = DispatchOrchestrator::new(fast_timings(), Arc::new(NoOpEventPublisher));
    for truck in demo_trucks() {
        orch.register_truck(truck).unwrap();
    }
    for station in demo_stations() {
        orch.register_station(station).unwrap();
    }
    orch
}

fn planner(url: String) -> HttpRoutePlanner {
    HttpRoutePlanner::new(&format!("{}/plan", url), Duration::from_secs(5)).unwrap()
}

const PLAN_RESPONSE: &str = r#"{
    "routePlans": [{
        "truckId": "t001",
        "driver": "Иванов И.И.",
        "fuelType": "АИ-95",
        "totalVolumeLoaded": 30000,
        "estimatedTime": "2 ч 10 мин",
        "estimatedCost": 145.0,
        "route": [
            {"type": "depot", "action": "Загрузить 30 000л АИ-95", "name": "Нефтебаза", "coordinates": [54.333, 29.1331]},
            {"type": "station", "action": "Разгрузить 20 000л АИ-95", "name": "Белоруснефть АЗС №15", "coordinates": [54.3215, 29.1553]},
            {"type": "station", "action": "Разгрузить 10 000л АИ-95", "name": "Газпромнефть АЗС №53", "coordinates": [54.2985, 29.2311]},
            {"type": "depot", "action": "Вернуться на нефтебазу", "name": "Нефтебаза", "coordinates": [54.333, 29.1331]}
        ]
    }]
}"#;

#[tokio::test]
async fn test_planned_route_is_dispatched() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/plan")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "truck": {"id": "t001", "fuelType": "АИ-95", "status": "IDLE"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PLAN_RESPONSE)
        .expect(1)
        .create_async()
        .await;

    let orch = seeded_orchestrator();
    let plans = orch
        .plan_routes(&planner(server.url()), "t001", None)
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(plans.len(), 1);

    let ticket = orch.dispatch("t001", plans[0].clone()).unwrap();
    assert_eq!(ticket.planned_unload_l, 30000.0);
    orch.wait_for(&ticket.dispatch_id).await.unwrap();

    let s001 = orch.station("s001").unwrap();
    assert_eq!(s001.level(FuelType::Ai95).unwrap().current_l, 28000.0);
    let s003 = orch.station("s003").unwrap();
    assert_eq!(s003.level(FuelType::Ai95).unwrap().current_l, 19000.0);
    assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::Idle);
}

#[tokio::test]
async fn test_request_carries_only_matching_needs() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/plan")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Белоруснефть АЗС №15".to_string()),
            Matcher::Regex("Газпромнефть АЗС №53".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"routePlans": null, "message": "no feasible route"}"#)
        .create_async()
        .await;

    let orch = seeded_orchestrator();
    let plans = orch
        .plan_routes(&planner(server.url()), "t001", None)
        .await
        .unwrap();
    mock.assert_async().await;
    assert!(plans.is_empty());
}

#[tokio::test]
async fn test_planner_not_called_without_candidates() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/plan")
        .expect(0)
        .create_async()
        .await;

    let orch = seeded_orchestrator();
    // s002 has no deficit
    let only_s002 = vec!["s002".to_string()];
    let plans = orch
        .plan_routes(&planner(server.url()), "t001", Some(&only_s002))
        .await
        .unwrap();
    assert!(plans.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_planner_errors_surface() {
    let mut server = Server::new_async().await;
    let _unavailable = server
        .mock("POST", "/plan")
        .with_status(503)
        .with_body("model overloaded")
        .create_async()
        .await;

    let orch = seeded_orchestrator();
    let err = orch
        .plan_routes(&planner(server.url()), "t001", None)
        .await
        .unwrap_err();
    match err {
        DispatchError::Planner(msg) => assert!(msg.contains("model overloaded")),
        other => panic!("Expected Planner error, got {:?}", other),
    }

    let mut server = Server::new_async().await;
    let _refused = server
        .mock("POST", "/plan")
        .with_status(200)
        .with_body(r#"{"error": "API key missing"}"#)
        .create_async()
        .await;
    let err = orch
        .plan_routes(&planner(server.url()), "t001", None)
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::Planner("API key missing".to_string()));
}

#[tokio::test]
async fn test_retired_truck_not_planned() {
    let server = Server::new_async().await;
    let orch = seeded_orchestrator();
    orch.retire_truck("t004").unwrap();

    let err = orch
        .plan_routes(&planner(server.url()), "t004", None)
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::TruckRetired("t004".to_string()));
}
