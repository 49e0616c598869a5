// ==========================================
// Fuel Dispatch - Dispatch API
// ==========================================
// Route planning, dispatch admission and ledger/report queries.
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::delivery_log::DeliveryLogEntry;
use crate::domain::route_plan::RoutePlan;
use crate::domain::types::TruckStatus;
use crate::engine::{
    ActiveDispatch, DispatchOrchestrator, DispatchReport, DispatchTicket, RevenueReport,
    RoutePlanner,
};
use std::sync::Arc;
use tracing::info;

pub struct DispatchApi {
    orchestrator: Arc<DispatchOrchestrator>,
    planner: Arc<dyn RoutePlanner>,
}

impl DispatchApi {
    pub fn new(orchestrator: Arc<DispatchOrchestrator>, planner: Arc<dyn RoutePlanner>) -> Self {
        Self {
            orchestrator,
            planner,
        }
    }

    // ==========================================
    // Planning & admission
    // ==========================================

    /// Candidate plans for an idle truck; `station_ids` narrows the selection
    pub async fn plan_routes(
        &self,
        truck_id: &str,
        station_ids: Option<&[String]>,
    ) -> ApiResult<Vec<RoutePlan>> {
        let plans = self
            .orchestrator
            .plan_routes(self.planner.as_ref(), truck_id, station_ids)
            .await?;
        info!(truck_id, plans = plans.len(), "route plans received");
        Ok(plans)
    }

    pub fn dispatch(&self, truck_id: &str, plan: RoutePlan) -> ApiResult<DispatchTicket> {
        Ok(self.orchestrator.dispatch(truck_id, plan)?)
    }

    /// Plans and dispatches the first proposal; `None` when nothing needs refuelling
    pub async fn plan_and_dispatch(&self, truck_id: &str) -> ApiResult<Option<DispatchTicket>> {
        let plans = self.plan_routes(truck_id, None).await?;
        match plans.into_iter().next() {
            Some(plan) => Ok(Some(self.dispatch(truck_id, plan)?)),
            None => Ok(None),
        }
    }

    pub fn truck_status(&self, truck_id: &str) -> ApiResult<TruckStatus> {
        Ok(self.orchestrator.truck_status(truck_id)?)
    }

    pub fn active_dispatches(&self) -> Vec<ActiveDispatch> {
        self.orchestrator.active_dispatches()
    }

    pub async fn wait_all(&self) -> Vec<DispatchReport> {
        self.orchestrator.wait_all().await
    }

    // ==========================================
    // Ledger & revenue
    // ==========================================

    /// Ledger in append order, optionally for one truck
    pub fn ledger(&self, truck_id: Option<&str>) -> Vec<DeliveryLogEntry> {
        let entries = self.orchestrator.ledger();
        match truck_id {
            Some(id) => entries.into_iter().filter(|e| e.truck_id == id).collect(),
            None => entries,
        }
    }

    pub fn revenue_report(&self) -> RevenueReport {
        self.orchestrator.revenue_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::domain::station::{FuelLevel, Station};
    use crate::domain::truck::Truck;
    use crate::domain::types::FuelType;
    use crate::engine::{PhaseTimings, SequentialRoutePlanner};
    use crate::engine::events::NoOpEventPublisher;
    use std::time::Duration;

    fn api() -> DispatchApi {
        let timings = PhaseTimings {
            outbound: Duration::from_millis(10),
            unload: Duration::from_millis(10),
            return_transit: Duration::from_millis(10),
            reload: Duration::from_millis(10),
        };
        let orch = DispatchOrchestrator::new(timings, Arc::new(NoOpEventPublisher));
        orch.register_truck(Truck::new("t001", "А123БВ 77", FuelType::Ai95, 30000.0, "Иванов И.И."))
            .unwrap();
        orch.register_station(
            Station::new("s001", "АЗС №15", "ул. Московская, 107", (54.3215, 29.1553))
                .with_level(FuelLevel::new(FuelType::Ai95, 8000.0, 10000.0, 40000.0)),
        )
        .unwrap();
        DispatchApi::new(Arc::new(orch), Arc::new(SequentialRoutePlanner))
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_and_dispatch_records_ledger() {
        let api = api();
        let ticket = api.plan_and_dispatch("t001").await.unwrap().unwrap();
        // deficit 32000 L, capped by the 30000 L tank
        assert_eq!(ticket.planned_unload_l, 30000.0);

        let err = api.plan_routes("t001", None).await.unwrap_err();
        assert!(matches!(err, ApiError::TruckBusy(_)));

        let reports = api.wait_all().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(api.ledger(Some("t001")).len(), 1);
        assert!(api.ledger(Some("t999")).is_empty());
        assert_eq!(api.truck_status("t001").unwrap(), TruckStatus::Idle);
    }
}
