// ==========================================
// Fuel Dispatch - Fleet API
// ==========================================
// Truck registration, edits and retirement. Engine state is changed
// first; the truck table is written only after the engine accepted.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::truck::{Truck, TruckView};
use crate::engine::DispatchOrchestrator;
use crate::importer::TruckImporter;
use crate::repository::FleetRepository;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct FleetApi {
    orchestrator: Arc<DispatchOrchestrator>,
    fleet_repo: Arc<FleetRepository>,
}

impl FleetApi {
    pub fn new(orchestrator: Arc<DispatchOrchestrator>, fleet_repo: Arc<FleetRepository>) -> Self {
        Self {
            orchestrator,
            fleet_repo,
        }
    }

    pub fn list_trucks(&self) -> Vec<TruckView> {
        self.orchestrator.trucks()
    }

    pub fn get_truck(&self, truck_id: &str) -> ApiResult<TruckView> {
        Ok(self.orchestrator.truck(truck_id)?)
    }

    pub fn register_truck(&self, truck: Truck) -> ApiResult<()> {
        self.orchestrator.register_truck(truck.clone())?;
        self.fleet_repo.upsert(&truck)?;
        info!(truck_id = %truck.id, "truck registered");
        Ok(())
    }

    /// Edits plate, fuel type, capacity or driver of an idle truck
    pub fn update_truck(&self, truck: Truck) -> ApiResult<Truck> {
        let updated = self.orchestrator.update_truck(truck)?;
        self.fleet_repo.upsert(&updated)?;
        Ok(updated)
    }

    pub fn retire_truck(&self, truck_id: &str) -> ApiResult<Truck> {
        let retired = self.orchestrator.retire_truck(truck_id)?;
        self.fleet_repo.upsert(&retired)?;
        Ok(retired)
    }

    /// Registers every truck of a CSV file.
    ///
    /// The file is validated as a whole before anything is registered;
    /// ids already in the fleet are rejected.
    pub fn import_trucks(&self, path: &Path) -> ApiResult<usize> {
        let trucks = TruckImporter::import_file(path)?;
        let mut seen = HashSet::new();
        for truck in &trucks {
            if !seen.insert(truck.id.as_str()) || self.orchestrator.truck(&truck.id).is_ok() {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "truck {} already registered",
                    truck.id
                )));
            }
        }

        for truck in &trucks {
            self.orchestrator.register_truck(truck.clone())?;
        }
        let written = self.fleet_repo.upsert_all(&trucks)?;
        info!(path = %path.display(), trucks = written, "truck import finished");
        Ok(written)
    }
}
