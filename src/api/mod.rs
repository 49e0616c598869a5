// ==========================================
// Fuel Dispatch - API layer
// ==========================================
// Caller-facing operations used by the CLI; wraps the engine and
// keeps the database in step with it.
// ==========================================

pub mod config_api;
pub mod dispatch_api;
pub mod error;
pub mod fleet_api;
pub mod station_api;

pub use config_api::{ConfigApi, ConfigItem};
pub use dispatch_api::DispatchApi;
pub use error::{ApiError, ApiResult};
pub use fleet_api::FleetApi;
pub use station_api::StationApi;
