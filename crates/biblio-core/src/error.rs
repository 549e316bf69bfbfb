//! # Error Types
//!
//! Domain-specific error types for biblio-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  biblio-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  biblio-db errors (separate crate)                                     │
//! │  └── DbError          - Ledger store failures                          │
//! │                                                                         │
//! │  biblio-engine errors (separate crate)                                 │
//! │  └── EngineError      - What borrow/return callers see                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (index number, loan id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// These errors represent borrowing rule violations or domain state failures.
/// They are returned synchronously to the caller and never leave the ledger
/// mutated.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Student cannot be found.
    ///
    /// ## When This Occurs
    /// - Index number not registered
    /// - Card UID not linked to any student
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    /// Loan cannot be found.
    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    /// The student is already at the active-loan ceiling.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan card, scan item
    ///      │
    ///      ▼
    /// Count active loans: 3 (ceiling 3)
    ///      │
    ///      ▼
    /// LimitExceeded { student_index: "UE2020001", active: 3, limit: 3 }
    ///      │
    ///      ▼
    /// Kiosk shows: "Return a book before borrowing another"
    /// ```
    #[error("Loan limit reached for {student_index}: {active} active of {limit} allowed")]
    LimitExceeded {
        student_index: String,
        active: u32,
        limit: u32,
    },

    /// Loan is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Returning a loan that is already RETURNED
    ///
    /// Note: callers treat a double return as a no-op, not a hard failure;
    /// this variant exists for operations where the state truly forbids
    /// proceeding.
    #[error("Loan {loan_id} is {current_status}, cannot perform operation")]
    InvalidLoanState {
        loan_id: String,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when registration or scan input doesn't meet
/// requirements. Used for early validation before any ledger write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, bad characters in a tag).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate index number or card UID).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::LimitExceeded {
            student_index: "UE2020001".to_string(),
            active: 3,
            limit: 3,
        };
        assert_eq!(
            err.to_string(),
            "Loan limit reached for UE2020001: 3 active of 3 allowed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "index_number".to_string(),
        };
        assert_eq!(err.to_string(), "index_number is required");

        let err = ValidationError::TooLong {
            field: "full_name".to_string(),
            max: 120,
        };
        assert_eq!(err.to_string(), "full_name must be at most 120 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "item_tag".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
