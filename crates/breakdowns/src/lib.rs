//! Breakdown tracking domain module (event-sourced).
//!
//! Incident records filed from the field against an operational unit. A
//! breakdown has its own lifecycle (Reported → InProgress → Resolved) and
//! never mutates the unit it references.

pub mod breakdown;

pub use breakdown::{
    Breakdown, BreakdownCommand, BreakdownDeleted, BreakdownEvent, BreakdownKind,
    BreakdownReported, BreakdownStatus, BreakdownStatusChanged, DeleteBreakdown, GeoPoint,
    ReportBreakdown, SetBreakdownStatus,
};
