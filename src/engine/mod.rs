// ==========================================
// Fuel Dispatch - Engine layer
// ==========================================
// Dispatch lifecycle, inventory simulation and the delivery ledger.
// No SQL here: persistence goes through repository via snapshots.
// ==========================================

pub mod consumption;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod fleet;
mod guard;
pub mod interpreter;
pub mod inventory;
pub mod ledger;
pub mod orchestrator;
pub mod planning;
pub mod pricing;
pub mod report;

pub use consumption::{ConsumptionHandle, ConsumptionProcess, ConsumptionSettings};
pub use dispatch::{
    ActiveDispatch, DispatchBoard, DispatchPhase, DispatchReport, DispatchStateMachine,
    PhaseTimings,
};
pub use error::{DispatchError, DispatchResult};
pub use events::{BroadcastPublisher, DispatchEvent, DispatchEventPublisher, NoOpEventPublisher};
pub use fleet::Fleet;
pub use interpreter::{InterpretedPlan, ParsedUnload, ResolvedDeliveries, RoutePlanInterpreter};
pub use inventory::{BatchOutcome, DeliveryOutcome, PlannedDelivery, StationInventory};
pub use ledger::DeliveryLedger;
pub use orchestrator::{DispatchOrchestrator, DispatchTicket};
pub use planning::{
    build_planning_request, HttpRoutePlanner, RoutePlanner, SequentialRoutePlanner,
};
pub use pricing::PriceBook;
pub use report::{FuelRevenue, RevenueReport};
