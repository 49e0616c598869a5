// ==========================================
// Fuel Dispatch - Route planning client side
// ==========================================
// The planner is an external service: this module only builds its
// request, calls it and hands back RoutePlans. Nothing here waits on
// the planner once a dispatch is accepted.
// ==========================================

use crate::domain::route_plan::{
    PlanningRequest, PlanningResponse, RefuelCandidate, RoutePlan, RouteStep, TruckPayload,
};
use crate::domain::truck::Truck;
use crate::domain::types::{Coordinates, TruckStatus};
use crate::engine::error::{DispatchError, DispatchResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Depot every route starts and ends at
pub const DEPOT_NAME: &str = "Нефтебаза";
pub const DEPOT_COORDINATES: Coordinates = (54.3330, 29.1331);

// ==========================================
// Request building
// ==========================================

/// Request for one truck, keeping only the needs it can serve.
///
/// `None` when no candidate needs the truck's fuel type; the planner is
/// not called in that case.
pub fn build_planning_request(
    truck: &Truck,
    status: TruckStatus,
    candidates: Vec<RefuelCandidate>,
) -> Option<PlanningRequest> {
    let stations_to_refuel: Vec<RefuelCandidate> = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            candidate
                .fuel_needed
                .retain(|need| need.fuel_type == truck.fuel_type);
            (!candidate.fuel_needed.is_empty()).then_some(candidate)
        })
        .collect();

    if stations_to_refuel.is_empty() {
        return None;
    }

    Some(PlanningRequest {
        truck: TruckPayload {
            truck: truck.clone(),
            status,
        },
        stations_to_refuel,
    })
}

// ==========================================
// RoutePlanner trait
// ==========================================

#[async_trait]
pub trait RoutePlanner: Send + Sync {
    /// Empty result means "no feasible plan"
    async fn plan_routes(&self, request: &PlanningRequest) -> DispatchResult<Vec<RoutePlan>>;
}

// ==========================================
// HttpRoutePlanner - POST JSON to the planning service
// ==========================================
pub struct HttpRoutePlanner {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRoutePlanner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(endpoint: &str, timeout: Duration) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Planner(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RoutePlanner for HttpRoutePlanner {
    async fn plan_routes(&self, request: &PlanningRequest) -> DispatchResult<Vec<RoutePlan>> {
        debug!(
            endpoint = %self.endpoint,
            truck_id = %request.truck.truck.id,
            stations = request.stations_to_refuel.len(),
            "requesting route plan"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| DispatchError::Planner(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "route planner returned an error status");
            return Err(DispatchError::Planner(format!(
                "planner responded with {}: {}",
                status, text
            )));
        }

        let body: PlanningResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Planner(format!("unreadable response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(DispatchError::Planner(error));
        }
        if let Some(message) = &body.message {
            info!(message = %message, "route planner message");
        }

        Ok(body.route_plans.unwrap_or_default())
    }
}

// ==========================================
// SequentialRoutePlanner - offline planner for demos
// ==========================================
// Visits candidates largest deficit first and unloads as much of each
// deficit as the tank still holds. No distance optimisation.
#[derive(Debug, Clone, Default)]
pub struct SequentialRoutePlanner;

#[async_trait]
impl RoutePlanner for SequentialRoutePlanner {
    async fn plan_routes(&self, request: &PlanningRequest) -> DispatchResult<Vec<RoutePlan>> {
        let truck = &request.truck.truck;

        let mut stops: Vec<(&RefuelCandidate, f64)> = request
            .stations_to_refuel
            .iter()
            .filter_map(|c| {
                let need: f64 = c
                    .fuel_needed
                    .iter()
                    .filter(|n| n.fuel_type == truck.fuel_type)
                    .map(|n| n.volume.floor())
                    .sum();
                (need > 0.0).then_some((c, need))
            })
            .collect();
        stops.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut remaining = truck.capacity_l.floor();
        let mut route = Vec::new();
        for (candidate, need) in stops {
            if remaining <= 0.0 {
                break;
            }
            let volume = need.min(remaining);
            remaining -= volume;

            let mut step = RouteStep::station(
                &format!("Unload {}L {}", volume as u64, truck.fuel_type.label()),
                &candidate.station.name,
                candidate.station.coordinates,
            );
            step.address = Some(candidate.station.address.clone());
            route.push(step);
        }

        if route.is_empty() {
            return Ok(Vec::new());
        }

        let loaded = truck.capacity_l.floor() - remaining;
        let stops = route.len();
        route.insert(
            0,
            RouteStep::depot(
                &format!("Load {}L {}", loaded as u64, truck.fuel_type.label()),
                DEPOT_NAME,
                DEPOT_COORDINATES,
            ),
        );
        route.push(RouteStep::depot("Return to depot", DEPOT_NAME, DEPOT_COORDINATES));

        Ok(vec![RoutePlan {
            truck_id: truck.id.clone(),
            driver: truck.driver.clone(),
            fuel_type: truck.fuel_type,
            total_volume_loaded_l: loaded,
            estimated_time: format!("{} stop(s)", stops),
            estimated_cost: 0.0,
            route,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route_plan::FuelNeed;
    use crate::domain::station::{FuelLevel, Station};
    use crate::domain::types::FuelType;

    fn candidate(id: &str, needs: &[(FuelType, f64)]) -> RefuelCandidate {
        let mut station = Station::new(id, &format!("АЗС {}", id), "addr", (54.3, 29.1));
        for (fuel, _) in needs {
            station = station.with_level(FuelLevel::new(*fuel, 0.0, 100.0, 50000.0));
        }
        RefuelCandidate {
            station,
            fuel_needed: needs
                .iter()
                .map(|(fuel_type, volume)| FuelNeed {
                    fuel_type: *fuel_type,
                    volume: *volume,
                })
                .collect(),
        }
    }

    fn truck() -> Truck {
        Truck::new("t001", "А123БВ 77", FuelType::Ai95, 30000.0, "Иванов И.И.")
    }

    #[test]
    fn test_build_request_filters_by_truck_fuel() {
        let candidates = vec![
            candidate("s001", &[(FuelType::Ai95, 20000.0), (FuelType::Diesel, 5000.0)]),
            candidate("s002", &[(FuelType::Diesel, 7000.0)]),
        ];
        let request = build_planning_request(&truck(), TruckStatus::Idle, candidates).unwrap();
        assert_eq!(request.stations_to_refuel.len(), 1);
        assert_eq!(request.stations_to_refuel[0].fuel_needed.len(), 1);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["truck"]["status"], "IDLE");
        assert_eq!(value["truck"]["fuelType"], "АИ-95");
        assert_eq!(value["stationsToRefuel"][0]["fuelNeeded"][0]["type"], "АИ-95");
    }

    #[test]
    fn test_build_request_none_when_nothing_matches() {
        let candidates = vec![candidate("s002", &[(FuelType::Diesel, 7000.0)])];
        assert!(build_planning_request(&truck(), TruckStatus::Idle, candidates).is_none());
    }

    #[tokio::test]
    async fn test_sequential_planner_respects_capacity() {
        let candidates = vec![
            candidate("s001", &[(FuelType::Ai95, 12000.0)]),
            candidate("s002", &[(FuelType::Ai95, 25000.0)]),
        ];
        let request = build_planning_request(&truck(), TruckStatus::Idle, candidates).unwrap();
        let plans = SequentialRoutePlanner.plan_routes(&request).await.unwrap();

        let plan = &plans[0];
        assert_eq!(plan.total_volume_loaded_l, 30000.0);
        assert_eq!(plan.route.len(), 4);
        assert_eq!(plan.route[1].name, "АЗС s002");
        assert_eq!(plan.route[1].action, "Unload 25000L АИ-95");
        assert_eq!(plan.route[2].action, "Unload 5000L АИ-95");
    }
}
