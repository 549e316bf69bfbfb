//! # Repository Implementations
//!
//! One repository per record kind. Repositories own all SQL; business
//! rules live in biblio-engine.
//!
//! - [`student`] - registration and card/index lookups
//! - [`loan`] - loan projection queries and the atomic borrow/return writes
//! - [`transaction`] - the append-only audit stream and sync flags

pub mod loan;
pub mod student;
pub mod transaction;
