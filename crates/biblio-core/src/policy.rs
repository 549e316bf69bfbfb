//! # Loan Policy
//!
//! The configurable borrowing rules: how many items a student may hold at
//! once, how long a loan runs, and how far ahead the due-soon query looks.
//!
//! ## Policy Application
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Loan Policy                                      │
//! │                                                                         │
//! │  Borrow(duration_days = 500)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  clamp_loan_days(500) → 365    ← durations are clamped, not rejected   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  due_at = now + 365 days                                               │
//! │                                                                         │
//! │  Borrow(4th item, ceiling 3) → LimitExceeded  ← ceilings ARE rejected  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_DUE_SOON_DAYS, DEFAULT_LOAN_DAYS, DEFAULT_LOAN_LIMIT, MAX_LOAN_DAYS, MIN_LOAN_DAYS,
};

/// Borrowing rules for a deployment.
///
/// Loaded from the kiosk config file; defaults match the library's standing
/// rules (3 items, 14 days, 2-day due-soon horizon).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPolicy {
    /// Maximum simultaneously active loans per student.
    #[serde(default = "default_loan_limit")]
    pub max_active_loans: u32,

    /// Loan duration used when the caller does not choose one.
    #[serde(default = "default_loan_days")]
    pub default_loan_days: i64,

    /// Horizon, in days, for the due-soon/overdue query.
    #[serde(default = "default_due_soon_days")]
    pub due_soon_horizon_days: i64,
}

fn default_loan_limit() -> u32 {
    DEFAULT_LOAN_LIMIT
}

fn default_loan_days() -> i64 {
    DEFAULT_LOAN_DAYS
}

fn default_due_soon_days() -> i64 {
    DEFAULT_DUE_SOON_DAYS
}

impl Default for LoanPolicy {
    fn default() -> Self {
        LoanPolicy {
            max_active_loans: default_loan_limit(),
            default_loan_days: default_loan_days(),
            due_soon_horizon_days: default_due_soon_days(),
        }
    }
}

impl LoanPolicy {
    /// Clamps a requested loan duration to the allowed range [1, 365] days.
    ///
    /// Out-of-range requests are a kiosk UI artifact, not user error, so
    /// they are clamped rather than rejected.
    #[inline]
    pub fn clamp_loan_days(&self, days: i64) -> i64 {
        days.clamp(MIN_LOAN_DAYS, MAX_LOAN_DAYS)
    }

    /// Returns the duration to use for a borrow request, applying the
    /// default when the caller passed none and clamping either way.
    #[inline]
    pub fn effective_loan_days(&self, requested: Option<i64>) -> i64 {
        self.clamp_loan_days(requested.unwrap_or(self.default_loan_days))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = LoanPolicy::default();
        assert_eq!(policy.max_active_loans, 3);
        assert_eq!(policy.default_loan_days, 14);
        assert_eq!(policy.due_soon_horizon_days, 2);
    }

    #[test]
    fn test_clamp_loan_days() {
        let policy = LoanPolicy::default();
        assert_eq!(policy.clamp_loan_days(0), 1);
        assert_eq!(policy.clamp_loan_days(-5), 1);
        assert_eq!(policy.clamp_loan_days(14), 14);
        assert_eq!(policy.clamp_loan_days(365), 365);
        assert_eq!(policy.clamp_loan_days(500), 365);
    }

    #[test]
    fn test_effective_loan_days() {
        let policy = LoanPolicy::default();
        assert_eq!(policy.effective_loan_days(None), 14);
        assert_eq!(policy.effective_loan_days(Some(7)), 7);
        assert_eq!(policy.effective_loan_days(Some(1000)), 365);
    }
}
