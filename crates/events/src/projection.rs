use crate::{Event, EventEnvelope};

/// A projection builds a read model from an append-only event stream.
///
/// Read models are **disposable**: they can be deleted and rebuilt from
/// events at any time. Events are the source of truth; a projection is an
/// optimized view (available-vehicle board, breakdown counters, expiry
/// board, structure profit/loss).
///
/// Because delivery is at-least-once, `apply` must be **idempotent**:
/// applying the same envelope twice must produce the same read model.
/// Strategies, in rough order of preference:
///
/// - sequence-number cursors per stream (the `ProjectionRunner` does this)
/// - event-id deduplication (track processed `event_id`s, skip repeats)
/// - naturally idempotent writes (upserts, set insertion)
///
/// The envelope carries the `structure`, which scopes every read-model
/// update; a projection must never mix data across structures.
pub trait Projection {
    type Ev: Event;

    /// Apply a single event to the projection, updating the read model.
    ///
    /// Irrelevant events should be ignored, not treated as errors. For
    /// structured failure handling use `ProjectionRunner::apply`, which
    /// enforces structure consistency and monotonic sequencing.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>);
}
