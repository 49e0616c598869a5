// ==========================================
// Fuel Dispatch - Application layer
// ==========================================
// Startup wiring, background tasks and demo data
// ==========================================

pub mod seed;
pub mod state;

pub use state::{get_default_db_path, AppState};
