//! Document expiry classification (pure derived state).
//!
//! This crate never mutates source records; it only derives urgency tiers
//! from expiry dates. The one mutation in the expiry workflow —
//! acknowledging a renewal by clearing a date — lives on the vehicle
//! aggregate, not here.

pub mod classify;

pub use classify::{ExpiryStatus, ExpiryTier, any_expired, classify, sort_by_urgency};
