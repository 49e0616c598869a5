// ==========================================
// Fuel Dispatch - Station API
// ==========================================
// Station registration and inventory queries. Every change is
// followed by a snapshot save so the station tables stay current.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::route_plan::RefuelCandidate;
use crate::domain::station::Station;
use crate::domain::types::FuelType;
use crate::engine::DispatchOrchestrator;
use crate::importer::StationImporter;
use crate::repository::SnapshotRepository;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct StationApi {
    orchestrator: Arc<DispatchOrchestrator>,
    snapshot_repo: Arc<SnapshotRepository>,
}

impl StationApi {
    pub fn new(
        orchestrator: Arc<DispatchOrchestrator>,
        snapshot_repo: Arc<SnapshotRepository>,
    ) -> Self {
        Self {
            orchestrator,
            snapshot_repo,
        }
    }

    pub fn list_stations(&self) -> Vec<Station> {
        self.orchestrator.station_inventory()
    }

    pub fn get_station(&self, station_id: &str) -> ApiResult<Station> {
        Ok(self.orchestrator.station(station_id)?)
    }

    /// Stations with at least one tank below its minimum
    pub fn refuel_candidates(&self, fuel_type: Option<FuelType>) -> Vec<RefuelCandidate> {
        self.orchestrator
            .inventory_handle()
            .refuel_candidates(fuel_type)
    }

    pub fn register_station(&self, station: Station) -> ApiResult<()> {
        self.orchestrator.register_station(station)?;
        self.persist()
    }

    /// Registers every station of a CSV file after checking ids and
    /// names against the file itself and the current inventory.
    pub fn import_stations(&self, path: &Path) -> ApiResult<usize> {
        let stations = StationImporter::import_file(path)?;

        let current = self.orchestrator.station_inventory();
        let mut ids: HashSet<&str> = current.iter().map(|s| s.id.as_str()).collect();
        let mut names: HashSet<&str> = current.iter().map(|s| s.name.as_str()).collect();
        for station in &stations {
            if !ids.insert(station.id.as_str()) {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "station {} already registered",
                    station.id
                )));
            }
            if !names.insert(station.name.as_str()) {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "station name {} already used",
                    station.name
                )));
            }
        }

        let count = stations.len();
        for station in stations {
            self.orchestrator.register_station(station)?;
        }
        self.persist()?;
        info!(path = %path.display(), stations = count, "station import finished");
        Ok(count)
    }

    /// Writes the current `{stations, ledger}` snapshot
    pub fn persist(&self) -> ApiResult<()> {
        let snapshot = self.orchestrator.snapshot();
        self.snapshot_repo.save(&snapshot)?;
        Ok(())
    }
}
