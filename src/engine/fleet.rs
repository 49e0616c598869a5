// ==========================================
// Fuel Dispatch - Fleet registry
// ==========================================
// Trucks are never deleted: retiring keeps them for ledger history.
// Edits that must not race a dispatch go through
// DispatchOrchestrator, which holds the board while calling in here.
// ==========================================

use crate::domain::truck::Truck;
use crate::engine::error::{DispatchError, DispatchResult};
use crate::engine::guard;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::info;

#[derive(Debug, Default)]
pub struct Fleet {
    trucks: RwLock<BTreeMap<String, Truck>>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, truck: Truck) -> DispatchResult<()> {
        truck
            .check_attributes()
            .map_err(DispatchError::InvalidTruck)?;

        let mut trucks = guard::write(&self.trucks);
        if trucks.contains_key(&truck.id) {
            return Err(DispatchError::DuplicateId {
                entity: "truck".to_string(),
                id: truck.id,
            });
        }
        info!(truck_id = %truck.id, fuel_type = %truck.fuel_type, capacity_l = truck.capacity_l, "truck registered");
        trucks.insert(truck.id.clone(), truck);
        Ok(())
    }

    /// Replaces a truck's attributes; the retired flag is kept as stored
    pub fn update(&self, truck: Truck) -> DispatchResult<Truck> {
        truck
            .check_attributes()
            .map_err(DispatchError::InvalidTruck)?;

        let mut trucks = guard::write(&self.trucks);
        let current = trucks
            .get_mut(&truck.id)
            .ok_or_else(|| DispatchError::not_found("truck", &truck.id))?;

        let retired = current.retired;
        *current = Truck { retired, ..truck };
        info!(truck_id = %current.id, "truck updated");
        Ok(current.clone())
    }

    pub fn retire(&self, truck_id: &str) -> DispatchResult<Truck> {
        let mut trucks = guard::write(&self.trucks);
        let truck = trucks
            .get_mut(truck_id)
            .ok_or_else(|| DispatchError::not_found("truck", truck_id))?;
        if !truck.retired {
            truck.retired = true;
            info!(truck_id, "truck retired");
        }
        Ok(truck.clone())
    }

    pub fn get(&self, truck_id: &str) -> DispatchResult<Truck> {
        guard::read(&self.trucks)
            .get(truck_id)
            .cloned()
            .ok_or_else(|| DispatchError::not_found("truck", truck_id))
    }

    /// Non-retired truck, ready to be dispatched
    pub fn dispatchable(&self, truck_id: &str) -> DispatchResult<Truck> {
        let truck = self.get(truck_id)?;
        if truck.retired {
            return Err(DispatchError::TruckRetired(truck.id));
        }
        Ok(truck)
    }

    /// All trucks in id order, retired included
    pub fn list(&self) -> Vec<Truck> {
        guard::read(&self.trucks).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        guard::read(&self.trucks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
