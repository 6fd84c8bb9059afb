//! Deterministic in-place command execution (no IO, no async).

/// Execute an aggregate command and immediately evolve the aggregate.
///
/// Combines the two halves of the aggregate lifecycle in one step:
///
/// 1. **Decide**: `aggregate.handle(command)` produces events (pure).
/// 2. **Evolve**: each event is applied via `aggregate.apply(event)`.
///
/// Useful for unit tests and inline workflows that need no persistence. For
/// the full pipeline (store, optimistic concurrency, publication) use the
/// command dispatcher in the infrastructure crate.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: fleetops_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
