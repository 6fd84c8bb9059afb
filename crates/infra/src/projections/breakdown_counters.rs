use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use fleetops_breakdowns::{BreakdownEvent, BreakdownKind, BreakdownStatus};
use fleetops_core::{BreakdownId, Structure};
use fleetops_events::EventEnvelope;
use fleetops_ops::UnitRef;

use crate::read_model::StructureStore;
use crate::services::AGGREGATE_BREAKDOWN;

/// Queryable breakdown row backing the dashboard counters.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub breakdown_id: BreakdownId,
    pub unit_ref: UnitRef,
    pub kind: BreakdownKind,
    pub status: BreakdownStatus,
}

#[derive(Debug, Error)]
pub enum BreakdownProjectionError {
    #[error("failed to deserialize breakdown event: {0}")]
    Deserialize(String),

    #[error("structure isolation violation: {0}")]
    StructureIsolation(String),
}

/// Breakdown counter projection.
///
/// Delivery on the change-notification stream is at-least-once and may
/// arrive for records a consumer has not fetched yet, so this projection
/// de-duplicates strictly by event id rather than by stream position.
/// Counters are derived from the rows at query time; the events carry no
/// numeric aggregation.
#[derive(Debug)]
pub struct BreakdownCountersProjection<S>
where
    S: StructureStore<BreakdownId, BreakdownRow>,
{
    store: S,
    seen: RwLock<HashSet<(Structure, Uuid)>>,
}

impl<S> BreakdownCountersProjection<S>
where
    S: StructureStore<BreakdownId, BreakdownRow>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            seen: RwLock::new(HashSet::new()),
        }
    }

    pub fn get(&self, structure: Structure, breakdown_id: &BreakdownId) -> Option<BreakdownRow> {
        self.store.get(structure, breakdown_id)
    }

    pub fn list(&self, structure: Structure) -> Vec<BreakdownRow> {
        self.store.list(structure)
    }

    /// Live counter: breakdowns per status for one structure.
    pub fn counts_by_status(&self, structure: Structure) -> HashMap<BreakdownStatus, usize> {
        let mut counts = HashMap::new();
        for row in self.store.list(structure) {
            *counts.entry(row.status).or_insert(0) += 1;
        }
        counts
    }

    /// Live counter: breakdowns per kind for one structure.
    pub fn counts_by_kind(&self, structure: Structure) -> HashMap<BreakdownKind, usize> {
        let mut counts = HashMap::new();
        for row in self.store.list(structure) {
            *counts.entry(row.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Apply a published envelope into the projection.
    ///
    /// Duplicate deliveries (same event id) are ignored. Envelopes for
    /// other aggregate types are skipped.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), BreakdownProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_BREAKDOWN {
            return Ok(());
        }

        let structure = envelope.structure();

        {
            let mut seen = match self.seen.write() {
                Ok(s) => s,
                Err(_) => return Ok(()),
            };
            if !seen.insert((structure, envelope.event_id())) {
                return Ok(());
            }
        }
        let event: BreakdownEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| BreakdownProjectionError::Deserialize(e.to_string()))?;

        let event_structure = match &event {
            BreakdownEvent::BreakdownReported(e) => e.structure,
            BreakdownEvent::BreakdownStatusChanged(e) => e.structure,
            BreakdownEvent::BreakdownDeleted(e) => e.structure,
        };
        if event_structure != structure {
            return Err(BreakdownProjectionError::StructureIsolation(
                "event structure does not match envelope structure".to_string(),
            ));
        }

        match event {
            BreakdownEvent::BreakdownReported(e) => {
                self.store.upsert(
                    structure,
                    e.breakdown_id,
                    BreakdownRow {
                        breakdown_id: e.breakdown_id,
                        unit_ref: e.unit_ref,
                        kind: e.kind,
                        status: BreakdownStatus::Reported,
                    },
                );
            }
            BreakdownEvent::BreakdownStatusChanged(e) => {
                if let Some(mut row) = self.store.get(structure, &e.breakdown_id) {
                    row.status = e.status;
                    self.store.upsert(structure, e.breakdown_id, row);
                }
            }
            BreakdownEvent::BreakdownDeleted(e) => {
                self.store.remove(structure, &e.breakdown_id);
            }
        }

        Ok(())
    }

    /// Rebuild from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        structure: Structure,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), BreakdownProjectionError> {
        self.store.clear_structure(structure);
        if let Ok(mut seen) = self.seen.write() {
            seen.retain(|(s, _)| *s != structure);
        }
        for env in envelopes {
            if env.structure() == structure {
                self.apply_envelope(&env)?;
            }
        }
        Ok(())
    }
}
