// ==========================================
// Fuel Dispatch - Dispatch orchestrator
// ==========================================
// Public entry point of the engine: accepts or rejects dispatches,
// owns the in-flight set and the per-dispatch tasks, and fronts the
// fleet, inventory, ledger and price book.
// ==========================================

use crate::domain::delivery_log::DeliveryLogEntry;
use crate::domain::route_plan::RoutePlan;
use crate::domain::snapshot::Snapshot;
use crate::domain::station::Station;
use crate::domain::truck::{Truck, TruckView};
use crate::domain::types::{FuelType, TruckStatus};
use crate::engine::consumption::{ConsumptionHandle, ConsumptionProcess, ConsumptionSettings};
use crate::engine::dispatch::{
    ActiveDispatch, DispatchBoard, DispatchReport, DispatchStateMachine, PhaseTimings,
};
use crate::engine::error::{DispatchError, DispatchResult};
use crate::engine::events::{emit, DispatchEvent, DispatchEventPublisher, NoOpEventPublisher};
use crate::engine::fleet::Fleet;
use crate::engine::guard;
use crate::engine::interpreter::RoutePlanInterpreter;
use crate::engine::inventory::StationInventory;
use crate::engine::ledger::DeliveryLedger;
use crate::engine::planning::{build_planning_request, RoutePlanner};
use crate::engine::pricing::PriceBook;
use crate::engine::report::RevenueReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// ==========================================
// DispatchTicket - receipt of an accepted dispatch
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchTicket {
    pub dispatch_id: String,
    pub truck_id: String,
    pub accepted_at: DateTime<Utc>,
    pub planned_unload_l: f64,
    pub status: TruckStatus,
}

// ==========================================
// DispatchOrchestrator
// ==========================================
pub struct DispatchOrchestrator {
    // ===== Owned state =====
    fleet: Arc<Fleet>,
    inventory: Arc<StationInventory>,
    ledger: Arc<DeliveryLedger>,
    board: Arc<DispatchBoard>,
    prices: Arc<PriceBook>,

    // ===== Wiring =====
    publisher: Arc<dyn DispatchEventPublisher>,
    timings: PhaseTimings,

    // ===== In-flight tasks, keyed by dispatch id =====
    // A task removes its own entry when it finishes.
    tasks: Arc<Mutex<HashMap<String, JoinHandle<DispatchReport>>>>,
}

impl DispatchOrchestrator {
    pub fn new(timings: PhaseTimings, publisher: Arc<dyn DispatchEventPublisher>) -> Self {
        Self {
            fleet: Arc::new(Fleet::new()),
            inventory: Arc::new(StationInventory::new()),
            ledger: Arc::new(DeliveryLedger::new()),
            board: Arc::new(DispatchBoard::new()),
            prices: Arc::new(PriceBook::default()),
            publisher,
            timings,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Orchestrator with default timings and no event observers
    pub fn with_defaults() -> Self {
        Self::new(PhaseTimings::default(), Arc::new(NoOpEventPublisher))
    }

    pub fn with_prices(mut self, prices: BTreeMap<FuelType, f64>) -> Self {
        self.prices = Arc::new(PriceBook::new(prices));
        self
    }

    pub fn timings(&self) -> PhaseTimings {
        self.timings
    }

    // ==========================================
    // Fleet
    // ==========================================

    pub fn register_truck(&self, truck: Truck) -> DispatchResult<()> {
        self.fleet.register(truck)
    }

    /// Attribute edit; refused while the truck is on a dispatch
    pub fn update_truck(&self, truck: Truck) -> DispatchResult<Truck> {
        let truck_id = truck.id.clone();
        self.board
            .while_idle(&truck_id, || self.fleet.update(truck))
    }

    /// Soft removal; refused while the truck is on a dispatch
    pub fn retire_truck(&self, truck_id: &str) -> DispatchResult<Truck> {
        self.board
            .while_idle(truck_id, || self.fleet.retire(truck_id))
    }

    pub fn truck(&self, truck_id: &str) -> DispatchResult<TruckView> {
        let truck = self.fleet.get(truck_id)?;
        let status = self.board.status(truck_id);
        Ok(TruckView { truck, status })
    }

    pub fn trucks(&self) -> Vec<TruckView> {
        self.fleet
            .list()
            .into_iter()
            .map(|truck| {
                let status = self.board.status(&truck.id);
                TruckView { truck, status }
            })
            .collect()
    }

    pub fn truck_status(&self, truck_id: &str) -> DispatchResult<TruckStatus> {
        self.fleet.get(truck_id)?;
        Ok(self.board.status(truck_id))
    }

    // ==========================================
    // Stations & ledger
    // ==========================================

    pub fn register_station(&self, station: Station) -> DispatchResult<()> {
        self.inventory.register_station(station)
    }

    pub fn station_inventory(&self) -> Vec<Station> {
        self.inventory.stations()
    }

    pub fn station(&self, station_id: &str) -> DispatchResult<Station> {
        self.inventory.station(station_id)
    }

    pub fn ledger(&self) -> Vec<DeliveryLogEntry> {
        self.ledger.entries()
    }

    pub fn inventory_handle(&self) -> Arc<StationInventory> {
        Arc::clone(&self.inventory)
    }

    // ==========================================
    // Prices & revenue
    // ==========================================

    pub fn fuel_prices(&self) -> BTreeMap<FuelType, f64> {
        self.prices.all()
    }

    pub fn adjust_fuel_price(&self, fuel_type: FuelType, price: f64) -> DispatchResult<()> {
        self.prices.set(fuel_type, price)?;
        info!(fuel_type = %fuel_type, price, "fuel price adjusted");
        Ok(())
    }

    pub fn revenue_report(&self) -> RevenueReport {
        RevenueReport::build(&self.ledger.entries(), &self.prices.all())
    }

    // ==========================================
    // Planning
    // ==========================================

    /// Asks `planner` for plans for an idle truck.
    ///
    /// `station_ids` narrows the candidates to a selection. Returns an
    /// empty list without calling the planner when no selected station
    /// needs the truck's fuel.
    pub async fn plan_routes(
        &self,
        planner: &dyn RoutePlanner,
        truck_id: &str,
        station_ids: Option<&[String]>,
    ) -> DispatchResult<Vec<RoutePlan>> {
        let truck = self.fleet.dispatchable(truck_id)?;
        let status = self.board.status(truck_id);
        if !status.is_idle() {
            return Err(DispatchError::TruckBusy {
                truck_id: truck_id.to_string(),
                status,
            });
        }

        let mut candidates = self.inventory.refuel_candidates(None);
        if let Some(ids) = station_ids {
            candidates.retain(|c| ids.iter().any(|id| id == &c.station.id));
        }

        match build_planning_request(&truck, status, candidates) {
            Some(request) => planner.plan_routes(&request).await,
            None => {
                info!(truck_id, fuel_type = %truck.fuel_type, "no station needs this truck's fuel");
                Ok(Vec::new())
            }
        }
    }

    // ==========================================
    // Dispatch
    // ==========================================

    /// Accepts `plan` for `truck_id` and starts its lifecycle task.
    ///
    /// Accept-or-reject is atomic: on any error nothing changed. Must be
    /// called inside a tokio runtime.
    pub fn dispatch(&self, truck_id: &str, plan: RoutePlan) -> DispatchResult<DispatchTicket> {
        let fleet = &self.fleet;
        let claimed = self.board.claim(truck_id, || {
            let truck = fleet.dispatchable(truck_id)?;
            let interpreted = RoutePlanInterpreter::interpret(&truck, &plan)?;
            Ok((truck, interpreted))
        });

        let (active, (truck, interpreted)) = match claimed {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!(truck_id, error = %e, "dispatch rejected");
                return Err(e);
            }
        };

        let ticket = DispatchTicket {
            dispatch_id: active.dispatch_id.clone(),
            truck_id: truck.id.clone(),
            accepted_at: active.accepted_at,
            planned_unload_l: interpreted.planned_volume_l(),
            status: active.status(),
        };

        info!(
            dispatch_id = %ticket.dispatch_id,
            truck_id,
            fuel_type = %truck.fuel_type,
            volume_l = interpreted.draft.total_volume_l,
            unloads = interpreted.unloads.len(),
            "dispatch accepted"
        );
        emit(
            self.publisher.as_ref(),
            DispatchEvent::Accepted {
                dispatch_id: ticket.dispatch_id.clone(),
                truck_id: truck.id.clone(),
                fuel_type: truck.fuel_type,
                volume_l: interpreted.draft.total_volume_l,
            },
        );

        let machine = DispatchStateMachine::new(
            &active,
            truck,
            interpreted,
            self.timings,
            Arc::clone(&self.inventory),
            Arc::clone(&self.ledger),
            Arc::clone(&self.board),
            Arc::clone(&self.publisher),
        );

        // The table stays locked until the handle is in, so the task's
        // own removal cannot run first.
        let tasks = Arc::clone(&self.tasks);
        let dispatch_id = ticket.dispatch_id.clone();
        let mut table = guard::lock(&self.tasks);
        let handle = tokio::spawn(async move {
            let report = machine.run().await;
            guard::lock(&tasks).remove(&dispatch_id);
            report
        });
        table.insert(ticket.dispatch_id.clone(), handle);
        drop(table);

        Ok(ticket)
    }

    pub fn active_dispatches(&self) -> Vec<ActiveDispatch> {
        self.board.active()
    }

    /// Dispatch tasks not yet finished or collected
    pub fn pending_tasks(&self) -> usize {
        guard::lock(&self.tasks).len()
    }

    /// Waits for one dispatch to finish.
    ///
    /// `None` if unknown or already finished: finished dispatches are only
    /// visible through the ledger.
    pub async fn wait_for(&self, dispatch_id: &str) -> Option<DispatchReport> {
        let handle = guard::lock(&self.tasks).remove(dispatch_id)?;
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(dispatch_id, error = %e, "dispatch task failed");
                None
            }
        }
    }

    /// Waits for every dispatch still in flight
    pub async fn wait_all(&self) -> Vec<DispatchReport> {
        let handles: Vec<(String, JoinHandle<DispatchReport>)> =
            guard::lock(&self.tasks).drain().collect();

        let (ids, handles): (Vec<String>, Vec<JoinHandle<DispatchReport>>) =
            handles.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        ids.into_iter()
            .zip(results)
            .filter_map(|(dispatch_id, result)| match result {
                Ok(report) => Some(report),
                Err(e) => {
                    error!(dispatch_id = %dispatch_id, error = %e, "dispatch task failed");
                    None
                }
            })
            .collect()
    }

    // ==========================================
    // Consumption
    // ==========================================

    pub fn start_consumption(&self, settings: ConsumptionSettings) -> ConsumptionHandle {
        ConsumptionProcess::new(
            Arc::clone(&self.inventory),
            Arc::clone(&self.publisher),
            settings,
        )
        .spawn()
    }

    // ==========================================
    // Snapshot / restore
    // ==========================================

    /// Consistent `{stations, ledger}` view: no delivery is half-visible
    pub fn snapshot(&self) -> Snapshot {
        let ledger = &self.ledger;
        self.inventory
            .snapshot_with(|stations| Snapshot::new(stations, ledger.entries()))
    }

    /// Replaces stations and ledger with `snapshot`.
    ///
    /// Refused while dispatches are in flight. A snapshot that breaks any
    /// invariant fails with `CorruptSnapshot` and changes nothing.
    pub fn restore(&self, snapshot: Snapshot) -> DispatchResult<()> {
        self.board.while_quiet(|| {
            snapshot.validate().map_err(DispatchError::CorruptSnapshot)?;

            let stations = snapshot.stations.len();
            let entries = snapshot.ledger.len();
            self.inventory
                .replace_all(snapshot.stations)
                .map_err(|e| DispatchError::CorruptSnapshot(e.to_string()))?;
            self.ledger
                .replace_all(snapshot.ledger)
                .map_err(DispatchError::CorruptSnapshot)?;

            info!(stations, entries, "snapshot restored");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route_plan::RouteStep;
    use crate::domain::station::FuelLevel;

    fn orchestrator() -> DispatchOrchestrator {
        let orch = DispatchOrchestrator::with_defaults();
        orch.register_truck(Truck::new("t001", "А123БВ 77", FuelType::Ai95, 30000.0, "Иванов И.И."))
            .unwrap();
        orch.register_station(
            Station::new("s001", "АЗС №15", "ул. Московская, 107", (54.3215, 29.1553))
                .with_level(FuelLevel::new(FuelType::Ai95, 8000.0, 10000.0, 40000.0)),
        )
        .unwrap();
        orch
    }

    fn plan(volume: f64) -> RoutePlan {
        let depot = (54.3330, 29.1331);
        RoutePlan {
            truck_id: "t001".to_string(),
            driver: "Иванов И.И.".to_string(),
            fuel_type: FuelType::Ai95,
            total_volume_loaded_l: volume,
            estimated_time: String::new(),
            estimated_cost: 0.0,
            route: vec![
                RouteStep::depot("Load", "Нефтебаза", depot),
                RouteStep::station(
                    &format!("Unload {}L AI-95", volume as u64),
                    "АЗС №15",
                    (54.3215, 29.1553),
                ),
                RouteStep::depot("Return", "Нефтебаза", depot),
            ],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_and_retire_refused_while_busy() {
        let orch = orchestrator();
        let ticket = orch.dispatch("t001", plan(1000.0)).unwrap();

        let truck = orch.truck("t001").unwrap().truck;
        assert!(matches!(orch.update_truck(truck), Err(DispatchError::TruckBusy { .. })));
        assert!(matches!(orch.retire_truck("t001"), Err(DispatchError::TruckBusy { .. })));
        assert!(matches!(
            orch.restore(Snapshot::new(vec![], vec![])),
            Err(DispatchError::DispatchesInFlight(1))
        ));

        orch.wait_for(&ticket.dispatch_id).await.unwrap();
        assert!(orch.retire_truck("t001").unwrap().retired);
        assert!(matches!(
            orch.dispatch("t001", plan(1000.0)),
            Err(DispatchError::TruckRetired(_))
        ));
    }

    #[test]
    fn test_truck_status_unknown_truck() {
        let orch = orchestrator();
        assert_eq!(orch.truck_status("t001").unwrap(), TruckStatus::Idle);
        assert!(matches!(
            orch.truck_status("t999"),
            Err(DispatchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_adjust_price_and_report() {
        let orch = orchestrator();
        orch.adjust_fuel_price(FuelType::Ai95, 3.0).unwrap();
        assert_eq!(orch.fuel_prices()[&FuelType::Ai95], 3.0);
        assert!(orch.adjust_fuel_price(FuelType::Ai95, -0.5).is_err());
        assert_eq!(orch.revenue_report().deliveries, 0);
    }
}
