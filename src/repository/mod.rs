// ==========================================
// Fuel Dispatch - Repository layer
// ==========================================
// SQLite access only; no business rules. All queries are
// parameterised.
// ==========================================

pub mod error;
pub mod fleet_repo;
pub mod snapshot_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use fleet_repo::FleetRepository;
pub use snapshot_repo::SnapshotRepository;
