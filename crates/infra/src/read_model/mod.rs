//! Structure-isolated read model storage abstractions.

pub mod structure_store;

pub use structure_store::{InMemoryStructureStore, StructureStore};
