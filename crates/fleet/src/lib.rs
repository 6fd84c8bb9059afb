//! Vehicle registry domain module (event-sourced).
//!
//! This crate contains business rules for vehicle identity, assignment
//! structure and status, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage). Status never changes implicitly: every
//! transition is an explicit command, issued by registry management or by
//! the operational-unit service when a unit opens.

pub mod vehicle;

pub use vehicle::{
    AttachDocument, ClearDocumentExpiry, DocumentAttached, DocumentExpiryCleared, RegisterVehicle,
    SetVehicleStatus, Vehicle, VehicleCommand, VehicleDocument, VehicleEvent, VehicleRegistered,
    VehicleStatus, VehicleStatusChanged,
};
