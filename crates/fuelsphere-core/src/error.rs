use thiserror::Error;
use uuid::Uuid;

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend itself failed (connection, constraint, serialization).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A persisted value could not be mapped back onto the domain model.
    #[error("cannot decode {field}: {detail}")]
    Decode { field: &'static str, detail: String },

    /// A record the transaction expected to update was not present.
    #[error("{table} row {id} is missing")]
    Missing { table: &'static str, id: Uuid },
}

/// Errors surfaced by the operations core to its callers.
#[derive(Debug, Error)]
pub enum OpsError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// A state transition's precondition failed.
    #[error("{0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OpsError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type OpsResult<T> = Result<T, OpsError>;
