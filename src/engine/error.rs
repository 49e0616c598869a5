// ==========================================
// Fuel Dispatch - Engine error types
// ==========================================
// TruckBusy / InvalidPlan reject a dispatch before anything mutates.
// UnknownStation is recovered inside a dispatch (step skipped).
// CorruptSnapshot is fatal to restore and startup.
// ==========================================

use crate::domain::types::TruckStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    // ===== Dispatch admission =====
    #[error("truck {truck_id} is busy ({status})")]
    TruckBusy { truck_id: String, status: TruckStatus },

    #[error("invalid route plan for truck {truck_id}: {reason}")]
    InvalidPlan { truck_id: String, reason: String },

    #[error("truck {0} is retired")]
    TruckRetired(String),

    // ===== Lookup =====
    #[error("unknown station: {0}")]
    UnknownStation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("duplicate {entity} id: {id}")]
    DuplicateId { entity: String, id: String },

    // ===== Data quality =====
    #[error("invalid station: {0}")]
    InvalidStation(String),

    #[error("invalid truck: {0}")]
    InvalidTruck(String),

    #[error("invalid fuel price: {0}")]
    InvalidPrice(String),

    // ===== Snapshot =====
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("{0} dispatch(es) still in flight")]
    DispatchesInFlight(usize),

    // ===== External planner =====
    #[error("route planner failed: {0}")]
    Planner(String),
}

impl DispatchError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        DispatchError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_plan(truck_id: &str, reason: impl Into<String>) -> Self {
        DispatchError::InvalidPlan {
            truck_id: truck_id.to_string(),
            reason: reason.into(),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
