// ==========================================
// Fuel Dispatch - Station inventory model
// ==========================================
// Sole owner of FuelLevel mutation.
// Locking:
// - each station sits behind its own Mutex
// - consumption holds one station at a time
// - batches and snapshots lock stations in id order (BTreeMap order)
// - the ledger lock is only ever taken after station locks
// ==========================================

use crate::domain::delivery_log::SkippedStep;
use crate::domain::route_plan::{FuelNeed, RefuelCandidate};
use crate::domain::station::Station;
use crate::domain::types::FuelType;
use crate::engine::error::{DispatchError, DispatchResult};
use crate::engine::guard;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

// ==========================================
// Delivery types
// ==========================================

/// One resolved unload: station id is known, volume is validated
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDelivery {
    pub station_id: String,
    pub station_name: String,
    pub fuel_type: FuelType,
    pub volume_l: f64,
}

/// Result of pouring fuel into one tank
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub station_id: String,
    pub station_name: String,
    pub fuel_type: FuelType,
    pub requested_l: f64,
    pub accepted_l: f64, // requested minus overflow
    pub spilled_l: f64,  // clipped at max
    pub level_after_l: f64,
}

/// Result of a delivery batch plus whatever the commit closure produced
#[derive(Debug, Clone)]
pub struct BatchOutcome<R> {
    pub outcomes: Vec<DeliveryOutcome>,
    pub skipped: Vec<SkippedStep>,
    pub committed: R,
}

impl<R> BatchOutcome<R> {
    pub fn delivered_l(&self) -> f64 {
        self.outcomes.iter().map(|o| o.accepted_l).sum()
    }
}

// ==========================================
// StationInventory
// ==========================================
#[derive(Debug, Default)]
pub struct StationInventory {
    stations: RwLock<BTreeMap<String, Arc<Mutex<Station>>>>,
}

impl StationInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an inventory from stations that must already satisfy every invariant
    pub fn from_stations(stations: Vec<Station>) -> DispatchResult<Self> {
        let inventory = Self::new();
        inventory.replace_all(stations)?;
        Ok(inventory)
    }

    // ==========================================
    // Registration
    // ==========================================

    pub fn register_station(&self, station: Station) -> DispatchResult<()> {
        station
            .check_invariants()
            .map_err(DispatchError::InvalidStation)?;

        let mut stations = guard::write(&self.stations);
        if stations.contains_key(&station.id) {
            return Err(DispatchError::DuplicateId {
                entity: "station".to_string(),
                id: station.id,
            });
        }
        if stations
            .values()
            .any(|s| guard::lock(s).name == station.name)
        {
            return Err(DispatchError::InvalidStation(format!(
                "station name {} is already used",
                station.name
            )));
        }

        info!(
            station_id = %station.id,
            name = %station.name,
            levels = station.fuel_levels.len(),
            "station registered"
        );
        stations.insert(station.id.clone(), Arc::new(Mutex::new(station)));
        Ok(())
    }

    /// Swaps the whole station set; validates before touching anything
    pub fn replace_all(&self, stations: Vec<Station>) -> DispatchResult<()> {
        let mut next = BTreeMap::new();
        for station in stations {
            station
                .check_invariants()
                .map_err(DispatchError::InvalidStation)?;
            if next.contains_key(&station.id) {
                return Err(DispatchError::DuplicateId {
                    entity: "station".to_string(),
                    id: station.id,
                });
            }
            next.insert(station.id.clone(), Arc::new(Mutex::new(station)));
        }

        *guard::write(&self.stations) = next;
        Ok(())
    }

    // ==========================================
    // Reads (cloned, may be stale by the time they are used)
    // ==========================================

    pub fn station(&self, station_id: &str) -> DispatchResult<Station> {
        let handle = self.handle(station_id)?;
        let station = guard::lock(&handle).clone();
        Ok(station)
    }

    pub fn stations(&self) -> Vec<Station> {
        self.handles()
            .iter()
            .map(|handle| guard::lock(handle).clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        guard::read(&self.stations).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Station id for a step target name (exact match, then trimmed case-insensitive)
    pub fn resolve_name(&self, name: &str) -> Option<String> {
        let handles = self.handles();
        let wanted = name.trim();

        let mut fallback = None;
        for handle in &handles {
            let station = guard::lock(handle);
            if station.name == name {
                return Some(station.id.clone());
            }
            if fallback.is_none() && station.name.trim().to_lowercase() == wanted.to_lowercase() {
                fallback = Some(station.id.clone());
            }
        }
        fallback
    }

    pub fn needs_refuel(&self, station_id: &str, fuel_type: FuelType) -> DispatchResult<bool> {
        self.with_level(station_id, fuel_type, |level| level.needs_refuel())
    }

    pub fn deficit_volume(
        &self,
        station_id: &str,
        fuel_type: FuelType,
    ) -> DispatchResult<Option<f64>> {
        self.with_level(station_id, fuel_type, |level| level.deficit_l())
    }

    /// Stations with at least one tank below minimum, optionally only for one fuel type
    pub fn refuel_candidates(&self, fuel_type: Option<FuelType>) -> Vec<RefuelCandidate> {
        self.stations()
            .into_iter()
            .filter_map(|station| {
                let fuel_needed: Vec<FuelNeed> = station
                    .fuel_levels
                    .iter()
                    .filter(|level| fuel_type.map_or(true, |f| f == level.fuel_type))
                    .filter_map(|level| {
                        level.deficit_l().map(|volume| FuelNeed {
                            fuel_type: level.fuel_type,
                            volume,
                        })
                    })
                    .collect();

                if fuel_needed.is_empty() {
                    None
                } else {
                    Some(RefuelCandidate {
                        station,
                        fuel_needed,
                    })
                }
            })
            .collect()
    }

    // ==========================================
    // Mutations
    // ==========================================

    /// `current = max(0, current - step)` on every tank of every station.
    ///
    /// A non-positive or non-finite step does nothing. Returns the number of
    /// tanks whose level changed.
    pub fn apply_consumption(&self, step_l: f64) -> usize {
        if !step_l.is_finite() || step_l <= 0.0 {
            debug!(step_l, "consumption step ignored");
            return 0;
        }

        let mut changed = 0;
        for handle in self.handles() {
            let mut station = guard::lock(&handle);
            for level in station.fuel_levels.iter_mut() {
                let next = (level.current_l - step_l).max(0.0);
                if next != level.current_l {
                    level.current_l = next;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// `current = min(max, current + volume)` on a single tank
    pub fn apply_delivery(
        &self,
        station_id: &str,
        fuel_type: FuelType,
        volume_l: f64,
    ) -> DispatchResult<DeliveryOutcome> {
        let handle = self.handle(station_id)?;
        let mut station = guard::lock(&handle);
        if station.level(fuel_type).is_none() {
            return Err(DispatchError::not_found(
                "fuel level",
                &format!("{}/{}", station_id, fuel_type),
            ));
        }
        Ok(pour(&mut station, fuel_type, volume_l))
    }

    /// Applies a delivery batch and runs `commit` as one unit.
    ///
    /// All affected stations are locked (id order) and every delivery is
    /// checked before the first tank changes. Deliveries whose station or
    /// fuel entry is missing are skipped and reported. `commit` runs while
    /// the locks are still held, so no reader sees the tanks updated without
    /// whatever `commit` records.
    pub fn apply_batch<R>(
        &self,
        deliveries: &[PlannedDelivery],
        commit: impl FnOnce(&[DeliveryOutcome], &[SkippedStep]) -> R,
    ) -> BatchOutcome<R> {
        // Station handles, deduplicated and ordered by id
        let handles: BTreeMap<String, Arc<Mutex<Station>>> = {
            let stations = guard::read(&self.stations);
            deliveries
                .iter()
                .filter_map(|d| {
                    stations
                        .get(&d.station_id)
                        .map(|h| (d.station_id.clone(), Arc::clone(h)))
                })
                .collect()
        };

        let mut locked: BTreeMap<&str, MutexGuard<'_, Station>> = handles
            .iter()
            .map(|(id, handle)| (id.as_str(), guard::lock(handle)))
            .collect();

        // Check phase
        let mut applicable = Vec::with_capacity(deliveries.len());
        let mut skipped = Vec::new();
        for delivery in deliveries {
            match locked.get(delivery.station_id.as_str()) {
                None => {
                    warn!(station_id = %delivery.station_id, "delivery target vanished, skipped");
                    skipped.push(SkippedStep::new(
                        &delivery.station_name,
                        format!("station {} not found", delivery.station_id),
                    ));
                }
                Some(station) if station.level(delivery.fuel_type).is_none() => {
                    warn!(
                        station_id = %delivery.station_id,
                        fuel_type = %delivery.fuel_type,
                        "station has no tank for this fuel, skipped"
                    );
                    skipped.push(SkippedStep::new(
                        &delivery.station_name,
                        format!("no {} tank", delivery.fuel_type),
                    ));
                }
                Some(_) => applicable.push(delivery),
            }
        }

        // Apply phase
        let mut outcomes = Vec::with_capacity(applicable.len());
        for delivery in applicable {
            if let Some(station) = locked.get_mut(delivery.station_id.as_str()) {
                outcomes.push(pour(station, delivery.fuel_type, delivery.volume_l));
            }
        }

        let committed = commit(&outcomes, &skipped);
        drop(locked);

        BatchOutcome {
            outcomes,
            skipped,
            committed,
        }
    }

    /// Clones every station with all stations locked, then hands the clones
    /// to `read_rest` before releasing the locks
    pub fn snapshot_with<R>(&self, read_rest: impl FnOnce(Vec<Station>) -> R) -> R {
        let handles = self.handles();
        let guards: Vec<MutexGuard<'_, Station>> = handles.iter().map(|h| guard::lock(h)).collect();
        let stations = guards.iter().map(|s| (**s).clone()).collect();
        let result = read_rest(stations);
        drop(guards);
        result
    }

    // ==========================================
    // Internals
    // ==========================================

    fn handle(&self, station_id: &str) -> DispatchResult<Arc<Mutex<Station>>> {
        guard::read(&self.stations)
            .get(station_id)
            .cloned()
            .ok_or_else(|| DispatchError::not_found("station", station_id))
    }

    fn handles(&self) -> Vec<Arc<Mutex<Station>>> {
        guard::read(&self.stations).values().cloned().collect()
    }

    fn with_level<T>(
        &self,
        station_id: &str,
        fuel_type: FuelType,
        f: impl FnOnce(&crate::domain::station::FuelLevel) -> T,
    ) -> DispatchResult<T> {
        let handle = self.handle(station_id)?;
        let station = guard::lock(&handle);
        station.level(fuel_type).map(f).ok_or_else(|| {
            DispatchError::not_found("fuel level", &format!("{}/{}", station_id, fuel_type))
        })
    }
}

/// Caller has checked the tank exists
fn pour(station: &mut Station, fuel_type: FuelType, volume_l: f64) -> DeliveryOutcome {
    let station_id = station.id.clone();
    let station_name = station.name.clone();
    let requested = if volume_l.is_finite() { volume_l.max(0.0) } else { 0.0 };

    let (accepted, level_after) = match station.level_mut(fuel_type) {
        Some(level) => {
            let accepted = requested.min(level.headroom_l());
            level.current_l = (level.current_l + accepted).min(level.max_l);
            (accepted, level.current_l)
        }
        None => (0.0, 0.0),
    };
    let spilled = requested - accepted;

    if spilled > 0.0 {
        warn!(
            station_id = %station_id,
            fuel_type = %fuel_type,
            requested_l = requested,
            spilled_l = spilled,
            "delivery exceeded tank capacity, overflow clipped"
        );
    }

    DeliveryOutcome {
        station_id,
        station_name,
        fuel_type,
        requested_l: requested,
        accepted_l: accepted,
        spilled_l: spilled,
        level_after_l: level_after,
    }
}
