// ==========================================
// Fuel Dispatch - Domain layer
// ==========================================
// Entities, closed enums and wire types.
// No storage access, no engine logic.
// ==========================================

pub mod delivery_log;
pub mod route_plan;
pub mod snapshot;
pub mod station;
pub mod truck;
pub mod types;

pub use delivery_log::{DeliveryDraft, DeliveryLogEntry, SkippedStep};
pub use route_plan::{
    FuelNeed, PlanningRequest, PlanningResponse, RefuelCandidate, RoutePlan, RouteStep,
    TruckPayload,
};
pub use snapshot::Snapshot;
pub use station::{FuelLevel, Station};
pub use truck::{Truck, TruckView};
pub use types::{Coordinates, FuelType, StepKind, TruckStatus};
