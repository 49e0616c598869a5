// ==========================================
// Fuel Dispatch - Station domain model
// ==========================================
// Invariants: 0 <= current <= max, min < max,
// one FuelLevel per fuel type per station.
// Stock mutation lives in engine::inventory only.
// ==========================================

use crate::domain::types::{Coordinates, FuelType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// FuelLevel - one tank at a station
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelLevel {
    #[serde(rename = "type")]
    pub fuel_type: FuelType, // fuel grade of this tank
    #[serde(rename = "current")]
    pub current_l: f64, // stock on hand (liters)
    #[serde(rename = "min")]
    pub min_l: f64, // refuel threshold
    #[serde(rename = "max")]
    pub max_l: f64, // tank capacity
}

impl FuelLevel {
    pub fn new(fuel_type: FuelType, current_l: f64, min_l: f64, max_l: f64) -> Self {
        Self {
            fuel_type,
            current_l,
            min_l,
            max_l,
        }
    }

    /// `current < min`
    pub fn needs_refuel(&self) -> bool {
        self.current_l < self.min_l
    }

    /// `max - current`, only when the tank needs refueling
    pub fn deficit_l(&self) -> Option<f64> {
        if self.needs_refuel() {
            Some(self.max_l - self.current_l)
        } else {
            None
        }
    }

    /// Free space left in the tank
    pub fn headroom_l(&self) -> f64 {
        (self.max_l - self.current_l).max(0.0)
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        let all_finite =
            self.current_l.is_finite() && self.min_l.is_finite() && self.max_l.is_finite();
        if !all_finite {
            return Err(format!("{}: non-finite stock values", self.fuel_type));
        }
        if self.min_l < 0.0 {
            return Err(format!("{}: min {} is negative", self.fuel_type, self.min_l));
        }
        if self.min_l >= self.max_l {
            return Err(format!(
                "{}: min {} must be below max {}",
                self.fuel_type, self.min_l, self.max_l
            ));
        }
        if self.current_l < 0.0 || self.current_l > self.max_l {
            return Err(format!(
                "{}: current {} outside [0, {}]",
                self.fuel_type, self.current_l, self.max_l
            ));
        }
        Ok(())
    }
}

// ==========================================
// Station - gas station
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    // ===== Identity =====
    pub id: String,

    // ===== Attributes =====
    pub name: String,               // also the planner's step target name
    pub address: String,            // postal address
    pub coordinates: Coordinates,   // (lat, lon)

    // ===== Tanks (ordered) =====
    pub fuel_levels: Vec<FuelLevel>,
}

impl Station {
    pub fn new(id: &str, name: &str, address: &str, coordinates: Coordinates) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            address: address.to_string(),
            coordinates,
            fuel_levels: Vec::new(),
        }
    }

    /// Builder-style tank registration
    pub fn with_level(mut self, level: FuelLevel) -> Self {
        self.fuel_levels.push(level);
        self
    }

    pub fn level(&self, fuel_type: FuelType) -> Option<&FuelLevel> {
        self.fuel_levels.iter().find(|l| l.fuel_type == fuel_type)
    }

    pub(crate) fn level_mut(&mut self, fuel_type: FuelType) -> Option<&mut FuelLevel> {
        self.fuel_levels.iter_mut().find(|l| l.fuel_type == fuel_type)
    }

    /// Fuel types currently below their minimum
    pub fn deficient_types(&self) -> Vec<FuelType> {
        self.fuel_levels
            .iter()
            .filter(|l| l.needs_refuel())
            .map(|l| l.fuel_type)
            .collect()
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("station id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err(format!("station {} has an empty name", self.id));
        }

        let mut seen = HashSet::new();
        for level in &self.fuel_levels {
            if !seen.insert(level.fuel_type) {
                return Err(format!(
                    "station {} lists {} more than once",
                    self.id, level.fuel_type
                ));
            }
            level
                .check_invariants()
                .map_err(|e| format!("station {}: {}", self.id, e))?;
        }
        Ok(())
    }
}
