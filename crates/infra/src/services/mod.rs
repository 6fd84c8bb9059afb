//! Application services: orchestration over the dispatcher and guards.
//!
//! Services own the workflows that span more than one aggregate or need a
//! constraint guard. Everything here takes `structure` as an explicit
//! parameter; nothing is inferred from ambient context.

pub mod billing;
pub mod ops;

pub use billing::BillingService;
pub use ops::OpsService;

use crate::command_dispatcher::DispatchError;
use crate::constraints::ConstraintViolation;

/// Stream type tags, one per aggregate.
pub const AGGREGATE_VEHICLE: &str = "fleet.vehicle";
pub const AGGREGATE_DAY_UNIT: &str = "ops.day";
pub const AGGREGATE_MISSION_UNIT: &str = "ops.mission";
pub const AGGREGATE_BREAKDOWN: &str = "breakdowns.breakdown";
pub const AGGREGATE_INVOICE: &str = "billing.invoice";
pub const AGGREGATE_EXPENSE: &str = "expenses.expense";

/// Service-level failure.
#[derive(Debug)]
pub enum ServiceError {
    /// The underlying dispatch failed.
    Dispatch(DispatchError),
    /// A constraint guard rejected the claim (duplicate open day).
    Conflict(String),
    /// The vehicle is not available for allocation.
    InvalidVehicle(String),
    /// A referenced entity does not exist.
    NotFound,
    /// Invoice numbering kept colliding past the retry cap.
    NumberingExhausted { attempts: u32 },
}

impl From<DispatchError> for ServiceError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::NotFound => ServiceError::NotFound,
            DispatchError::InvalidVehicle(msg) => ServiceError::InvalidVehicle(msg),
            other => ServiceError::Dispatch(other),
        }
    }
}

impl From<ConstraintViolation> for ServiceError {
    fn from(value: ConstraintViolation) -> Self {
        ServiceError::Conflict(value.to_string())
    }
}
