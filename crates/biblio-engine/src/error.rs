//! # Engine Error Types
//!
//! What borrow/return callers see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                     │
//! │                                  ├──► EngineError ──► kiosk caller     │
//! │  sqlx::Error ──────► DbError ────┘                                     │
//! │                                                                         │
//! │  Domain errors (not found, limit reached) render as user messages.     │
//! │  Storage errors are fatal to the operation and propagate as-is.        │
//! │  Neither leaves the ledger mutated.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use biblio_core::CoreError;
use biblio_db::DbError;

/// Errors returned by loan lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A borrowing rule or lookup failed (student/loan not found,
    /// limit exceeded, invalid input).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The ledger store is unavailable or a write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl From<biblio_core::ValidationError> for EngineError {
    fn from(err: biblio_core::ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl EngineError {
    /// Returns true when the error is a rule violation the kiosk should
    /// show the user, as opposed to a storage fault.
    pub fn is_domain(&self) -> bool {
        matches!(self, EngineError::Domain(_))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_transparent() {
        let err: EngineError = CoreError::StudentNotFound("UE2020001".to_string()).into();
        assert_eq!(err.to_string(), "Student not found: UE2020001");
        assert!(err.is_domain());
    }

    #[test]
    fn test_storage_errors_are_labelled() {
        let err: EngineError = DbError::PoolExhausted.into();
        assert_eq!(err.to_string(), "Storage error: Connection pool exhausted");
        assert!(!err.is_domain());
    }
}
