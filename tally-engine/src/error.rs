use tally_core::AmountError;
use tally_ledger::StoreError;
use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error taxonomy surfaced by every engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::Internal(_) => "internal",
        }
    }

    /// HTTP status the request layer maps this error to.
    pub fn status(&self) -> u16 {
        match self {
            EngineError::InvalidArgument(_) => 400,
            EngineError::NotFound(_) => 404,
            EngineError::Conflict(_) => 409,
            EngineError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Constraint(message) => EngineError::Conflict(message),
            other => EngineError::Internal(other.to_string()),
        }
    }
}

impl From<AmountError> for EngineError {
    fn from(value: AmountError) -> Self {
        EngineError::InvalidArgument(value.to_string())
    }
}
