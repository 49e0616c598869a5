// ==========================================
// Fuel Dispatch - Route plan & planner wire types
// ==========================================
// RoutePlan is produced by the external planner and only read here.
// Field names follow the planner's JSON contract (camelCase).
// ==========================================

use crate::domain::station::Station;
use crate::domain::truck::Truck;
use crate::domain::types::{Coordinates, FuelType, StepKind, TruckStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// RouteStep - one stop of a plan
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    #[serde(rename = "type")]
    pub kind: StepKind, // depot | station
    pub action: String, // free text, e.g. "Unload 15000L АИ-95"
    pub name: String,   // target name (matched against station names)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub coordinates: Coordinates,
}

impl RouteStep {
    pub fn depot(action: &str, name: &str, coordinates: Coordinates) -> Self {
        Self {
            kind: StepKind::Depot,
            action: action.to_string(),
            name: name.to_string(),
            address: None,
            coordinates,
        }
    }

    pub fn station(action: &str, name: &str, coordinates: Coordinates) -> Self {
        Self {
            kind: StepKind::Station,
            action: action.to_string(),
            name: name.to_string(),
            address: None,
            coordinates,
        }
    }
}

// ==========================================
// RoutePlan - one trip for one truck
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub truck_id: String,
    pub driver: String,
    pub fuel_type: FuelType,
    #[serde(rename = "totalVolumeLoaded")]
    pub total_volume_loaded_l: f64, // liters loaded at the depot
    pub estimated_time: String,      // informational only
    pub estimated_cost: f64,
    pub route: Vec<RouteStep>,
}

// ==========================================
// Planner request
// ==========================================

/// Volume a station needs for one fuel type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelNeed {
    #[serde(rename = "type")]
    pub fuel_type: FuelType,
    pub volume: f64,
}

/// A station below minimum on at least one fuel type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefuelCandidate {
    pub station: Station,
    pub fuel_needed: Vec<FuelNeed>,
}

/// Truck as sent to the planner (status included)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckPayload {
    #[serde(flatten)]
    pub truck: Truck,
    pub status: TruckStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRequest {
    pub truck: TruckPayload,
    pub stations_to_refuel: Vec<RefuelCandidate>,
}

/// Planner response envelope; `routePlans: null` means no feasible plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningResponse {
    #[serde(default)]
    pub route_plans: Option<Vec<RoutePlan>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
