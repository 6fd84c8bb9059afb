use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use fleetops_core::{AggregateId, Structure, VehicleId};
use fleetops_events::EventEnvelope;
use fleetops_fleet::{VehicleEvent, VehicleStatus};

use crate::read_model::StructureStore;
use crate::services::AGGREGATE_VEHICLE;

/// Queryable vehicle board row: current status per vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRow {
    pub vehicle_id: VehicleId,
    pub plate: String,
    pub status: VehicleStatus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    structure: Structure,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum VehicleProjectionError {
    #[error("failed to deserialize vehicle event: {0}")]
    Deserialize(String),

    #[error("structure isolation violation: {0}")]
    StructureIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Vehicle board projection.
///
/// The `list_available` query is the candidate pool for opening a new
/// operational unit. The read is not snapshot-isolated against concurrent
/// opens; a vehicle offered twice is resolved by the availability check at
/// open time, not here.
#[derive(Debug)]
pub struct VehicleBoardProjection<S>
where
    S: StructureStore<VehicleId, VehicleRow>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> VehicleBoardProjection<S>
where
    S: StructureStore<VehicleId, VehicleRow>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, structure: Structure, vehicle_id: &VehicleId) -> Option<VehicleRow> {
        self.store.get(structure, vehicle_id)
    }

    pub fn list(&self, structure: Structure) -> Vec<VehicleRow> {
        self.store.list(structure)
    }

    /// Vehicles with status Available for the given structure.
    pub fn list_available(&self, structure: Structure) -> Vec<VehicleRow> {
        let mut rows: Vec<_> = self
            .store
            .list(structure)
            .into_iter()
            .filter(|row| row.status == VehicleStatus::Available)
            .collect();
        rows.sort_by(|a, b| a.plate.cmp(&b.plate));
        rows
    }

    /// Apply a published envelope into the projection.
    ///
    /// Idempotent for at-least-once delivery: replays at or below the
    /// stream cursor are ignored. Envelopes for other aggregate types are
    /// skipped without advancing any cursor.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), VehicleProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_VEHICLE {
            return Ok(());
        }

        let structure = envelope.structure();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let mut cursors = match self.cursors.write() {
            Ok(c) => c,
            Err(_) => return Ok(()),
        };
        let key = CursorKey {
            structure,
            aggregate_id,
        };
        let last = *cursors.get(&key).unwrap_or(&0);

        if seq == 0 {
            return Err(VehicleProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }
        if last != 0 && seq != last + 1 {
            return Err(VehicleProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: VehicleEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| VehicleProjectionError::Deserialize(e.to_string()))?;

        let event_structure = match &event {
            VehicleEvent::VehicleRegistered(e) => e.structure,
            VehicleEvent::VehicleStatusChanged(e) => e.structure,
            VehicleEvent::DocumentAttached(e) => e.structure,
            VehicleEvent::DocumentExpiryCleared(e) => e.structure,
        };
        if event_structure != structure {
            return Err(VehicleProjectionError::StructureIsolation(
                "event structure does not match envelope structure".to_string(),
            ));
        }

        match event {
            VehicleEvent::VehicleRegistered(e) => {
                self.store.upsert(
                    structure,
                    e.vehicle_id,
                    VehicleRow {
                        vehicle_id: e.vehicle_id,
                        plate: e.plate,
                        status: VehicleStatus::Available,
                    },
                );
            }
            VehicleEvent::VehicleStatusChanged(e) => {
                if let Some(mut row) = self.store.get(structure, &e.vehicle_id) {
                    row.status = e.status;
                    self.store.upsert(structure, e.vehicle_id, row);
                }
            }
            // Documents live on the expiry board, not here.
            VehicleEvent::DocumentAttached(_) | VehicleEvent::DocumentExpiryCleared(_) => {}
        }

        cursors.insert(key, seq);
        Ok(())
    }

    /// Rebuild from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        structure: Structure,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), VehicleProjectionError> {
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
