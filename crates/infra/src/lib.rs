//! Infrastructure layer: event persistence, command orchestration,
//! constraint guards, read models.
//!
//! Domain crates stay pure; everything that touches shared state lives
//! here. The two cross-aggregate invariants (one open day per driver,
//! unique invoice numbers) are enforced by atomic constraint guards with
//! retry-on-conflict at the service call sites, never by read-then-write
//! checks inside domain code.

pub mod command_dispatcher;
pub mod constraints;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod services;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use constraints::{
    ConstraintViolation, InMemoryInvoiceNumberGuard, InMemoryOpenDayGuard, InvoiceNumberGuard,
    OpenDayGuard,
};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use read_model::{InMemoryStructureStore, StructureStore};
pub use services::{BillingService, OpsService, ServiceError};
