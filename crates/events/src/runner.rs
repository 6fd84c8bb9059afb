//! Projection runner utilities (read model builders).
//!
//! Read models are **disposable**; events are the source of truth.
//! This module provides deterministic replay and cursor tracking without
//! making storage assumptions.

use fleetops_core::Structure;

use crate::{EventEnvelope, Projection};

/// Tracks projection progress for a single structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProjectionCursor {
    structure: Structure,
    last_sequence_number: u64,
}

impl ProjectionCursor {
    pub fn structure(&self) -> Structure {
        self.structure
    }

    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence_number
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    StructureMismatch {
        expected: Structure,
        found: Structure,
    },
    NonMonotonicSequence {
        last: u64,
        found: u64,
    },
}

/// Runs envelopes through a projection and tracks progress.
#[derive(Debug)]
pub struct ProjectionRunner<P>
where
    P: Projection,
{
    projection: P,
    cursor: Option<ProjectionCursor>,
}

impl<P> ProjectionRunner<P>
where
    P: Projection,
{
    pub fn new(projection: P) -> Self {
        Self {
            projection,
            cursor: None,
        }
    }

    /// Create a runner pinned to a specific structure.
    ///
    /// This prevents accidentally starting a projection with an event from
    /// the wrong structure.
    pub fn new_for_structure(structure: Structure, projection: P) -> Self {
        Self {
            projection,
            cursor: Some(ProjectionCursor {
                structure,
                last_sequence_number: 0,
            }),
        }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut P {
        &mut self.projection
    }

    pub fn into_projection(self) -> P {
        self.projection
    }

    /// Current cursor/version for this projection (if any envelopes were applied).
    pub fn cursor(&self) -> Option<ProjectionCursor> {
        self.cursor
    }

    /// Apply a single envelope, enforcing structure consistency and monotonic
    /// sequencing.
    pub fn apply(&mut self, envelope: &EventEnvelope<P::Ev>) -> Result<(), ProjectionError> {
        let found_structure = envelope.structure();
        let found_seq = envelope.sequence_number();

        match self.cursor {
            None => {
                self.projection.apply(envelope);
                self.cursor = Some(ProjectionCursor {
                    structure: found_structure,
                    last_sequence_number: found_seq,
                });
                Ok(())
            }
            Some(mut c) => {
                if c.structure != found_structure {
                    return Err(ProjectionError::StructureMismatch {
                        expected: c.structure,
                        found: found_structure,
                    });
                }
                if found_seq <= c.last_sequence_number {
                    return Err(ProjectionError::NonMonotonicSequence {
                        last: c.last_sequence_number,
                        found: found_seq,
                    });
                }

                self.projection.apply(envelope);
                c.last_sequence_number = found_seq;
                self.cursor = Some(c);
                Ok(())
            }
        }
    }

    /// Apply many envelopes in order.
    pub fn run<'a>(
        &mut self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(), ProjectionError>
    where
        P::Ev: 'a,
    {
        for env in envelopes {
            self.apply(env)?;
        }
        Ok(())
    }

    /// Rebuild a projection from scratch by replaying the full event history.
    ///
    /// The factory is used to create a fresh projection instance.
    pub fn rebuild_from_scratch<'a>(
        factory: impl FnOnce() -> P,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<(P, Option<ProjectionCursor>), ProjectionError>
    where
        P::Ev: 'a,
    {
        let mut runner = ProjectionRunner::new(factory());
        runner.run(envelopes)?;
        Ok((runner.projection, runner.cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, EventEnvelope, Projection};
    use chrono::{DateTime, Utc};
    use fleetops_core::AggregateId;
    use uuid::Uuid;

    #[derive(Debug, Clone)]
    struct Ticked {
        at: DateTime<Utc>,
    }

    impl Event for Ticked {
        fn event_type(&self) -> &'static str {
            "test.ticked"
        }

        fn version(&self) -> u32 {
            1
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        applied: usize,
    }

    impl Projection for Counter {
        type Ev = Ticked;

        fn apply(&mut self, _envelope: &EventEnvelope<Ticked>) {
            self.applied += 1;
        }
    }

    fn env(structure: Structure, seq: u64) -> EventEnvelope<Ticked> {
        EventEnvelope::new(
            Uuid::now_v7(),
            structure,
            AggregateId::new(),
            "test.counter",
            seq,
            Ticked { at: Utc::now() },
        )
    }

    #[test]
    fn runner_advances_a_monotonic_cursor() {
        let mut runner = ProjectionRunner::new(Counter::default());
        runner.apply(&env(Structure::Gts, 1)).unwrap();
        runner.apply(&env(Structure::Gts, 2)).unwrap();

        assert_eq!(runner.projection().applied, 2);
        let cursor = runner.cursor().unwrap();
        assert_eq!(cursor.structure(), Structure::Gts);
        assert_eq!(cursor.last_sequence_number(), 2);
    }

    #[test]
    fn replayed_sequence_is_rejected() {
        let mut runner = ProjectionRunner::new(Counter::default());
        runner.apply(&env(Structure::Gts, 1)).unwrap();

        let err = runner.apply(&env(Structure::Gts, 1)).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::NonMonotonicSequence { last: 1, found: 1 }
        ));
        assert_eq!(runner.projection().applied, 1);
    }

    #[test]
    fn pinned_runner_rejects_the_wrong_structure() {
        let mut runner =
            ProjectionRunner::new_for_structure(Structure::Gts, Counter::default());
        let err = runner.apply(&env(Structure::Baticom, 1)).unwrap_err();
        assert!(matches!(err, ProjectionError::StructureMismatch { .. }));
        assert_eq!(runner.projection().applied, 0);
    }

    #[test]
    fn rebuild_replays_the_full_history() {
        let envelopes: Vec<_> = (1..=4).map(|seq| env(Structure::Baticom, seq)).collect();
        let (projection, cursor) =
            ProjectionRunner::rebuild_from_scratch(Counter::default, envelopes.iter()).unwrap();
        assert_eq!(projection.applied, 4);
        assert_eq!(cursor.unwrap().last_sequence_number(), 4);
    }
}
