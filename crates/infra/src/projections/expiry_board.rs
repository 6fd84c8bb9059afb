use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use thiserror::Error;

use fleetops_core::{AggregateId, Structure, VehicleId};
use fleetops_events::EventEnvelope;
use fleetops_expiry::{ExpiryStatus, any_expired, classify, sort_by_urgency};
use fleetops_fleet::VehicleEvent;

use crate::read_model::StructureStore;
use crate::services::AGGREGATE_VEHICLE;

/// One tracked document reference with its (optional) expiry date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub vehicle_id: VehicleId,
    pub label: String,
    pub url: String,
    pub expiry: Option<NaiveDate>,
}

/// A document row classified against a reference date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedDocument {
    pub row: DocumentRow,
    pub status: ExpiryStatus,
}

/// The classified board for one structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryBoard {
    /// Expired first, then soonest expiry ascending, stable on ties.
    pub documents: Vec<ClassifiedDocument>,
    /// True if any entry is Expired. Critical and Warning entries alone
    /// never raise this flag.
    pub urgent: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    structure: Structure,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum ExpiryProjectionError {
    #[error("failed to deserialize vehicle event: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Document expiry board projection.
///
/// Tracks document references attached to vehicles; classification is
/// derived at query time against a caller-supplied reference date, so the
/// board needs no clock and no refresh job.
#[derive(Debug)]
pub struct ExpiryBoardProjection<S>
where
    S: StructureStore<(VehicleId, String), DocumentRow>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> ExpiryBoardProjection<S>
where
    S: StructureStore<(VehicleId, String), DocumentRow>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn list(&self, structure: Structure) -> Vec<DocumentRow> {
        self.store.list(structure)
    }

    /// Classify every dated document for a structure against `today`.
    ///
    /// Documents whose expiry has been cleared (renewal acknowledged) drop
    /// off the board until a new dated reference is attached.
    pub fn board(&self, structure: Structure, today: NaiveDate) -> ExpiryBoard {
        let mut entries: Vec<(DocumentRow, ExpiryStatus)> = self
            .store
            .list(structure)
            .into_iter()
            .filter_map(|row| {
                let expiry = row.expiry?;
                let status = classify(expiry, today);
                Some((row, status))
            })
            .collect();

        // Deterministic pre-sort so urgency ties break stably.
        entries.sort_by(|a, b| {
            a.0.label
                .cmp(&b.0.label)
                .then_with(|| a.0.vehicle_id.as_uuid().cmp(b.0.vehicle_id.as_uuid()))
        });
        sort_by_urgency(&mut entries);

        let statuses: Vec<ExpiryStatus> = entries.iter().map(|(_, s)| *s).collect();
        let urgent = any_expired(&statuses);

        ExpiryBoard {
            documents: entries
                .into_iter()
                .map(|(row, status)| ClassifiedDocument { row, status })
                .collect(),
            urgent,
        }
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ExpiryProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_VEHICLE {
            return Ok(());
        }

        let structure = envelope.structure();
        let seq = envelope.sequence_number();

        let mut cursors = match self.cursors.write() {
            Ok(c) => c,
            Err(_) => return Ok(()),
        };
        let key = CursorKey {
            structure,
            aggregate_id: envelope.aggregate_id(),
        };
        let last = *cursors.get(&key).unwrap_or(&0);
        if seq == 0 {
            return Err(ExpiryProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }

        let event: VehicleEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ExpiryProjectionError::Deserialize(e.to_string()))?;

        match event {
            VehicleEvent::DocumentAttached(e) => {
                self.store.upsert(
                    structure,
                    (e.vehicle_id, e.label.clone()),
                    DocumentRow {
                        vehicle_id: e.vehicle_id,
                        label: e.label,
                        url: e.url,
                        expiry: e.expiry,
                    },
                );
            }
            VehicleEvent::DocumentExpiryCleared(e) => {
                let doc_key = (e.vehicle_id, e.label);
                if let Some(mut row) = self.store.get(structure, &doc_key) {
                    row.expiry = None;
                    self.store.upsert(structure, doc_key, row);
                }
            }
            VehicleEvent::VehicleRegistered(_) | VehicleEvent::VehicleStatusChanged(_) => {}
        }

        cursors.insert(key, seq);
        Ok(())
    }

    /// Rebuild from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        structure: Structure,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ExpiryProjectionError> {
        self.store.clear_structure(structure);
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.retain(|key, _| key.structure != structure);
        }
        for env in envelopes {
            if env.structure() == structure {
                self.apply_envelope(&env)?;
            }
        }
        Ok(())
    }
}
