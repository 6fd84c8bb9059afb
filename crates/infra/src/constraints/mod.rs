//! Atomic constraint guards for cross-aggregate invariants.
//!
//! Two invariants cannot be decided inside a single aggregate and must not
//! be enforced by read-then-write checks, because concurrent callers race
//! between the read and the write:
//!
//! 1. At most one Open day-unit per driver (partial-unique semantics on
//!    the driver while a unit is open).
//! 2. Invoice numbers unique per (structure, month, year, sequence),
//!    i.e. unique on the full formatted number.
//!
//! A guard is the in-process equivalent of a database unique index: a
//! single atomic claim that either succeeds or fails with a retryable
//! conflict. Services claim before dispatching and release on rollback.

pub mod invoice_number;
pub mod open_day;

pub use invoice_number::{InMemoryInvoiceNumberGuard, InvoiceNumberGuard};
pub use open_day::{InMemoryOpenDayGuard, OpenDayGuard};

use thiserror::Error;

/// Constraint guard failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// The driver already has an open day-unit.
    #[error("driver already has an open day-unit")]
    DuplicateOpenDay,

    /// The formatted invoice number is already claimed. Retryable: the
    /// caller regenerates and resubmits.
    #[error("invoice number already claimed: {0}")]
    DuplicateInvoiceNumber(String),

    /// Internal guard state was poisoned.
    #[error("constraint guard unavailable")]
    Unavailable,
}
