// ==========================================
// Fuel Dispatch - API error types
// ==========================================
// Converts engine, repository and import failures into
// caller-facing messages. Every variant carries an explicit reason.
// ==========================================

use crate::engine::error::DispatchError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Dispatch rejections
    // ==========================================
    #[error("truck busy: {0}")]
    TruckBusy(String),

    #[error("route plan rejected: {0}")]
    InvalidPlan(String),

    #[error("dispatches in flight: {0}")]
    DispatchesInFlight(usize),

    // ==========================================
    // Business rule errors
    // ==========================================
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("business rule violated: {0}")]
    BusinessRuleViolation(String),

    #[error("snapshot corrupt: {0}")]
    CorruptSnapshot(String),

    // ==========================================
    // External planner
    // ==========================================
    #[error("route planner unavailable: {0}")]
    PlannerError(String),

    // ==========================================
    // Data access
    // ==========================================
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // Import
    // ==========================================
    #[error("import failed: {0}")]
    ImportError(String),

    // ==========================================
    // Generic
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// From DispatchError
// ==========================================
impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::TruckBusy { .. } => ApiError::TruckBusy(err.to_string()),
            DispatchError::InvalidPlan { .. } => ApiError::InvalidPlan(err.to_string()),
            DispatchError::DispatchesInFlight(n) => ApiError::DispatchesInFlight(n),
            DispatchError::NotFound { .. } | DispatchError::UnknownStation(_) => {
                ApiError::NotFound(err.to_string())
            }
            DispatchError::InvalidStation(_)
            | DispatchError::InvalidTruck(_)
            | DispatchError::InvalidPrice(_) => ApiError::InvalidInput(err.to_string()),
            DispatchError::TruckRetired(_) | DispatchError::DuplicateId { .. } => {
                ApiError::BusinessRuleViolation(err.to_string())
            }
            DispatchError::CorruptSnapshot(msg) => ApiError::CorruptSnapshot(msg),
            DispatchError::Planner(msg) => ApiError::PlannerError(msg),
        }
    }
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={}) does not exist", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("database lock unavailable: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("unique constraint: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("foreign key: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::CorruptSnapshot(format!("stored field {}: {}", field, message))
            }
            RepositoryError::SerializationError(e) => ApiError::InternalError(e.to_string()),
            RepositoryError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// From ImportError
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportError(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Maps a `Box<dyn Error>` from the config layer
pub(crate) fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::DatabaseError(format!("config access failed: {}", err))
}
