//! Change-notification abstractions for the fleet core.
//!
//! Every mutation in the core is an immutable event. This crate defines the
//! event contract, the structure-scoped envelope that events travel in, the
//! pub/sub bus used by dashboard consumers, and the projection utilities that
//! build read models from event streams.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod projection;
pub mod runner;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::InMemoryEventBus;
pub use projection::Projection;
pub use runner::{ProjectionCursor, ProjectionError, ProjectionRunner};
