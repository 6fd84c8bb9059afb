use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fleetops_core::{Aggregate, AggregateRoot, DomainError, Structure, VehicleId};
use fleetops_events::Event;

/// Vehicle operational status.
///
/// Only `Available` vehicles may be selected when opening an operational
/// unit. Reverting to `Available` after a unit closes is a separate manual
/// operator action, never automatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    OnAssignment,
    InMaintenance,
    Unavailable,
}

/// A document attached to a vehicle (insurance, inspection, permit).
///
/// The `url` is an opaque reference into external document storage; the core
/// never inspects the content. `expiry` feeds the expiration monitor and is
/// cleared (not rewritten) when an operator acknowledges a renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDocument {
    pub label: String,
    pub url: String,
    pub expiry: Option<NaiveDate>,
}

/// Aggregate root: Vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    id: VehicleId,
    structure: Option<Structure>,
    plate: String,
    status: VehicleStatus,
    documents: Vec<VehicleDocument>,
    version: u64,
    created: bool,
}

impl Vehicle {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: VehicleId) -> Self {
        Self {
            id,
            structure: None,
            plate: String::new(),
            status: VehicleStatus::Available,
            documents: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> VehicleId {
        self.id
    }

    pub fn structure(&self) -> Option<Structure> {
        self.structure
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    pub fn documents(&self) -> &[VehicleDocument] {
        &self.documents
    }

    /// Invariant: only available vehicles may be allocated to a new unit.
    pub fn is_selectable(&self) -> bool {
        self.created && self.status == VehicleStatus::Available
    }
}

impl AggregateRoot for Vehicle {
    type Id = VehicleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterVehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterVehicle {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub plate: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetVehicleStatus.
///
/// No side effects beyond the status write. The operational-unit service
/// issues this when a unit opens; operators issue it for maintenance and the
/// manual post-closure revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVehicleStatus {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub status: VehicleStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachDocument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachDocument {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub label: String,
    pub url: String,
    pub expiry: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearDocumentExpiry.
///
/// Acknowledgement path for the expiration monitor: clears the expiry date
/// of the named document, leaving the reference itself untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearDocumentExpiry {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub label: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleCommand {
    RegisterVehicle(RegisterVehicle),
    SetVehicleStatus(SetVehicleStatus),
    AttachDocument(AttachDocument),
    ClearDocumentExpiry(ClearDocumentExpiry),
}

/// Event: VehicleRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistered {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub plate: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VehicleStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStatusChanged {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub status: VehicleStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAttached {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub label: String,
    pub url: String,
    pub expiry: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentExpiryCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentExpiryCleared {
    pub structure: Structure,
    pub vehicle_id: VehicleId,
    pub label: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleEvent {
    VehicleRegistered(VehicleRegistered),
    VehicleStatusChanged(VehicleStatusChanged),
    DocumentAttached(DocumentAttached),
    DocumentExpiryCleared(DocumentExpiryCleared),
}

impl Event for VehicleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            VehicleEvent::VehicleRegistered(_) => "fleet.vehicle.registered",
            VehicleEvent::VehicleStatusChanged(_) => "fleet.vehicle.status_changed",
            VehicleEvent::DocumentAttached(_) => "fleet.vehicle.document_attached",
            VehicleEvent::DocumentExpiryCleared(_) => "fleet.vehicle.document_expiry_cleared",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            VehicleEvent::VehicleRegistered(e) => e.occurred_at,
            VehicleEvent::VehicleStatusChanged(e) => e.occurred_at,
            VehicleEvent::DocumentAttached(e) => e.occurred_at,
            VehicleEvent::DocumentExpiryCleared(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Vehicle {
    type Command = VehicleCommand;
    type Event = VehicleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            VehicleEvent::VehicleRegistered(e) => {
                self.id = e.vehicle_id;
                self.structure = Some(e.structure);
                self.plate = e.plate.clone();
                self.status = VehicleStatus::Available;
                self.documents.clear();
                self.created = true;
            }
            VehicleEvent::VehicleStatusChanged(e) => {
                self.status = e.status;
            }
            VehicleEvent::DocumentAttached(e) => {
                // Re-attaching under the same label replaces the document.
                self.documents.retain(|d| d.label != e.label);
                self.documents.push(VehicleDocument {
                    label: e.label.clone(),
                    url: e.url.clone(),
                    expiry: e.expiry,
                });
            }
            VehicleEvent::DocumentExpiryCleared(e) => {
                if let Some(doc) = self.documents.iter_mut().find(|d| d.label == e.label) {
                    doc.expiry = None;
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            VehicleCommand::RegisterVehicle(cmd) => self.handle_register(cmd),
            VehicleCommand::SetVehicleStatus(cmd) => self.handle_set_status(cmd),
            VehicleCommand::AttachDocument(cmd) => self.handle_attach_document(cmd),
            VehicleCommand::ClearDocumentExpiry(cmd) => self.handle_clear_expiry(cmd),
        }
    }
}

impl Vehicle {
    fn ensure_structure(&self, structure: Structure) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.structure != Some(structure) {
            return Err(DomainError::invariant("structure mismatch"));
        }
        Ok(())
    }

    fn ensure_vehicle_id(&self, vehicle_id: VehicleId) -> Result<(), DomainError> {
        if self.id != vehicle_id {
            return Err(DomainError::invariant("vehicle_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterVehicle) -> Result<Vec<VehicleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("vehicle already registered"));
        }
        if cmd.plate.trim().is_empty() {
            return Err(DomainError::validation("plate cannot be empty"));
        }
        Ok(vec![VehicleEvent::VehicleRegistered(VehicleRegistered {
            structure: cmd.structure,
            vehicle_id: cmd.vehicle_id,
            plate: cmd.plate.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_status(&self, cmd: &SetVehicleStatus) -> Result<Vec<VehicleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_vehicle_id(cmd.vehicle_id)?;

        if cmd.status == self.status {
            // Idempotent: re-setting the current status emits nothing.
            return Ok(vec![]);
        }

        Ok(vec![VehicleEvent::VehicleStatusChanged(
            VehicleStatusChanged {
                structure: cmd.structure,
                vehicle_id: cmd.vehicle_id,
                status: cmd.status,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_attach_document(
        &self,
        cmd: &AttachDocument,
    ) -> Result<Vec<VehicleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_vehicle_id(cmd.vehicle_id)?;

        if cmd.label.trim().is_empty() {
            return Err(DomainError::validation("document label cannot be empty"));
        }
        if cmd.url.trim().is_empty() {
            return Err(DomainError::validation("document url cannot be empty"));
        }

        Ok(vec![VehicleEvent::DocumentAttached(DocumentAttached {
            structure: cmd.structure,
            vehicle_id: cmd.vehicle_id,
            label: cmd.label.clone(),
            url: cmd.url.clone(),
            expiry: cmd.expiry,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_clear_expiry(
        &self,
        cmd: &ClearDocumentExpiry,
    ) -> Result<Vec<VehicleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_vehicle_id(cmd.vehicle_id)?;

        let doc = self
            .documents
            .iter()
            .find(|d| d.label == cmd.label)
            .ok_or(DomainError::NotFound)?;

        if doc.expiry.is_none() {
            // Already acknowledged; nothing to clear.
            return Ok(vec![]);
        }

        Ok(vec![VehicleEvent::DocumentExpiryCleared(
            DocumentExpiryCleared {
                structure: cmd.structure,
                vehicle_id: cmd.vehicle_id,
                label: cmd.label.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
