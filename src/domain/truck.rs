// ==========================================
// Fuel Dispatch - Truck domain model
// ==========================================
// Operational status is NOT a field here: it is derived from the
// dispatch board (see engine::dispatch::DispatchBoard)
// ==========================================

use crate::domain::types::{FuelType, TruckStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// Truck - tanker truck
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truck {
    // ===== Identity =====
    pub id: String, // stable truck id

    // ===== Attributes =====
    #[serde(rename = "number")]
    pub plate_number: String, // registration plate
    pub fuel_type: FuelType, // the single grade this truck carries
    #[serde(rename = "volume")]
    pub capacity_l: f64, // tank capacity (liters)
    pub driver: String, // assigned driver

    // ===== Soft removal =====
    #[serde(default)]
    pub retired: bool, // retired trucks stay listed for ledger history
}

impl Truck {
    pub fn new(
        id: &str,
        plate_number: &str,
        fuel_type: FuelType,
        capacity_l: f64,
        driver: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            plate_number: plate_number.to_string(),
            fuel_type,
            capacity_l,
            driver: driver.to_string(),
            retired: false,
        }
    }

    /// Attribute checks applied on registration and edit
    pub fn check_attributes(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("truck id must not be empty".to_string());
        }
        if self.plate_number.trim().is_empty() {
            return Err(format!("truck {} has an empty plate number", self.id));
        }
        if !self.capacity_l.is_finite() || self.capacity_l <= 0.0 {
            return Err(format!(
                "truck {} capacity must be positive, got {}",
                self.id, self.capacity_l
            ));
        }
        Ok(())
    }
}

// ==========================================
// TruckView - truck plus derived status
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckView {
    #[serde(flatten)]
    pub truck: Truck,
    pub status: TruckStatus,
}
