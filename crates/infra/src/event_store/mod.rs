//! Append-only event persistence.

pub mod in_memory;
#[path = "trait.rs"]
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
