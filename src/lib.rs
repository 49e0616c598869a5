// ==========================================
// Fuel Dispatch - Core library
// ==========================================
// Tanker fleet dispatch against a simulated station inventory:
// route plans in, deliveries and a delivery ledger out.
// Stack: tokio + SQLite
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain - entities and value types
pub mod domain;

// Repository - SQLite access
pub mod repository;

// Engine - dispatch lifecycle and inventory simulation
pub mod engine;

// Import - CSV fleet/station files
pub mod importer;

// Configuration
pub mod config;

// Database infrastructure (connection setup, PRAGMAs, schema)
pub mod db;

// Logging
pub mod logging;

// API - caller-facing operations
pub mod api;

// Application - startup wiring and background tasks
pub mod app;

// ==========================================
// Re-exports
// ==========================================

// Domain types
pub use domain::types::{FuelType, StepKind, TruckStatus};

// Domain entities
pub use domain::{
    DeliveryLogEntry, FuelLevel, RoutePlan, RouteStep, SkippedStep, Snapshot, Station, Truck,
    TruckView,
};

// Engine
pub use engine::{
    DispatchError, DispatchOrchestrator, DispatchTicket, PhaseTimings, RoutePlanInterpreter,
    StationInventory,
};

// API
pub use api::{ApiError, ConfigApi, DispatchApi, FleetApi, StationApi};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Fuel Dispatch";
