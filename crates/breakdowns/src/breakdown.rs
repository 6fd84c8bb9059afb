use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetops_core::{Aggregate, AggregateRoot, BreakdownId, DomainError, Structure};
use fleetops_events::Event;
use fleetops_ops::UnitRef;

/// Breakdown status: forward-only, Resolved is terminal.
///
/// Permitted transitions: Reported→InProgress, InProgress→Resolved,
/// Reported→Resolved. No re-opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownStatus {
    Reported,
    InProgress,
    Resolved,
}

impl BreakdownStatus {
    fn can_transition_to(self, next: BreakdownStatus) -> bool {
        matches!(
            (self, next),
            (BreakdownStatus::Reported, BreakdownStatus::InProgress)
                | (BreakdownStatus::Reported, BreakdownStatus::Resolved)
                | (BreakdownStatus::InProgress, BreakdownStatus::Resolved)
        )
    }
}

/// Incident type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownKind {
    Mechanical,
    Tire,
    Electrical,
    Accident,
    Other,
}

/// Geolocation reported by the field actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Aggregate root: Breakdown.
///
/// `photo_ref` is an opaque reference into external document storage; on
/// deletion the reference is surfaced in the event so the storage
/// collaborator can release the binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    id: BreakdownId,
    structure: Option<Structure>,
    unit_ref: Option<UnitRef>,
    kind: BreakdownKind,
    description: String,
    geo: Option<GeoPoint>,
    photo_ref: Option<String>,
    status: BreakdownStatus,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Breakdown {
    /// Create an empty, not-yet-reported aggregate instance for rehydration.
    pub fn empty(id: BreakdownId) -> Self {
        Self {
            id,
            structure: None,
            unit_ref: None,
            kind: BreakdownKind::Other,
            description: String::new(),
            geo: None,
            photo_ref: None,
            status: BreakdownStatus::Reported,
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BreakdownId {
        self.id
    }

    pub fn structure(&self) -> Option<Structure> {
        self.structure
    }

    pub fn unit_ref(&self) -> Option<UnitRef> {
        self.unit_ref
    }

    pub fn kind(&self) -> BreakdownKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn geo(&self) -> Option<GeoPoint> {
        self.geo
    }

    pub fn photo_ref(&self) -> Option<&str> {
        self.photo_ref.as_deref()
    }

    pub fn status(&self) -> BreakdownStatus {
        self.status
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for Breakdown {
    type Id = BreakdownId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ReportBreakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBreakdown {
    pub structure: Structure,
    pub breakdown_id: BreakdownId,
    pub unit_ref: UnitRef,
    pub kind: BreakdownKind,
    pub description: String,
    pub geo: Option<GeoPoint>,
    pub photo_ref: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetBreakdownStatus (forward-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBreakdownStatus {
    pub structure: Structure,
    pub breakdown_id: BreakdownId,
    pub status: BreakdownStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteBreakdown (releases the photo reference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBreakdown {
    pub structure: Structure,
    pub breakdown_id: BreakdownId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BreakdownCommand {
    ReportBreakdown(ReportBreakdown),
    SetBreakdownStatus(SetBreakdownStatus),
    DeleteBreakdown(DeleteBreakdown),
}

/// Event: BreakdownReported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownReported {
    pub structure: Structure,
    pub breakdown_id: BreakdownId,
    pub unit_ref: UnitRef,
    pub kind: BreakdownKind,
    pub description: String,
    pub geo: Option<GeoPoint>,
    pub photo_ref: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BreakdownStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownStatusChanged {
    pub structure: Structure,
    pub breakdown_id: BreakdownId,
    pub status: BreakdownStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BreakdownDeleted.
///
/// `released_photo_ref` lets the storage collaborator free the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownDeleted {
    pub structure: Structure,
    pub breakdown_id: BreakdownId,
    pub released_photo_ref: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BreakdownEvent {
    BreakdownReported(BreakdownReported),
    BreakdownStatusChanged(BreakdownStatusChanged),
    BreakdownDeleted(BreakdownDeleted),
}

impl Event for BreakdownEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BreakdownEvent::BreakdownReported(_) => "breakdowns.breakdown.reported",
            BreakdownEvent::BreakdownStatusChanged(_) => "breakdowns.breakdown.status_changed",
            BreakdownEvent::BreakdownDeleted(_) => "breakdowns.breakdown.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BreakdownEvent::BreakdownReported(e) => e.occurred_at,
            BreakdownEvent::BreakdownStatusChanged(e) => e.occurred_at,
            BreakdownEvent::BreakdownDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Breakdown {
    type Command = BreakdownCommand;
    type Event = BreakdownEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BreakdownEvent::BreakdownReported(e) => {
                self.id = e.breakdown_id;
                self.structure = Some(e.structure);
                self.unit_ref = Some(e.unit_ref);
                self.kind = e.kind;
                self.description = e.description.clone();
                self.geo = e.geo;
                self.photo_ref = e.photo_ref.clone();
                self.status = BreakdownStatus::Reported;
                self.created = true;
            }
            BreakdownEvent::BreakdownStatusChanged(e) => {
                self.status = e.status;
            }
            BreakdownEvent::BreakdownDeleted(_) => {
                self.photo_ref = None;
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BreakdownCommand::ReportBreakdown(cmd) => self.handle_report(cmd),
            BreakdownCommand::SetBreakdownStatus(cmd) => self.handle_set_status(cmd),
            BreakdownCommand::DeleteBreakdown(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Breakdown {
    fn ensure_structure(&self, structure: Structure) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.structure != Some(structure) {
            return Err(DomainError::invariant("structure mismatch"));
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_report(&self, cmd: &ReportBreakdown) -> Result<Vec<BreakdownEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("breakdown already reported"));
        }
        if cmd.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        Ok(vec![BreakdownEvent::BreakdownReported(BreakdownReported {
            structure: cmd.structure,
            breakdown_id: cmd.breakdown_id,
            unit_ref: cmd.unit_ref,
            kind: cmd.kind,
            description: cmd.description.clone(),
            geo: cmd.geo,
            photo_ref: cmd.photo_ref.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_status(
        &self,
        cmd: &SetBreakdownStatus,
    ) -> Result<Vec<BreakdownEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_structure(cmd.structure)?;

        if !self.status.can_transition_to(cmd.status) {
            return Err(DomainError::invariant(format!(
                "breakdown status cannot move {:?} -> {:?}",
                self.status, cmd.status
            )));
        }

        Ok(vec![BreakdownEvent::BreakdownStatusChanged(
            BreakdownStatusChanged {
                structure: cmd.structure,
                breakdown_id: cmd.breakdown_id,
                status: cmd.status,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_delete(&self, cmd: &DeleteBreakdown) -> Result<Vec<BreakdownEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_structure(cmd.structure)?;

        Ok(vec![BreakdownEvent::BreakdownDeleted(BreakdownDeleted {
            structure: cmd.structure,
            breakdown_id: cmd.breakdown_id,
            released_photo_ref: self.photo_ref.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetops_core::UnitId;
    use fleetops_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn reported(photo_ref: Option<&str>) -> Breakdown {
        let id = BreakdownId::new();
        let mut b = Breakdown::empty(id);
        execute(
            &mut b,
            &BreakdownCommand::ReportBreakdown(ReportBreakdown {
                structure: Structure::Gts,
                breakdown_id: id,
                unit_ref: UnitRef::Mission(UnitId::new()),
                kind: BreakdownKind::Mechanical,
                description: "gearbox jammed on N1".to_string(),
                geo: Some(GeoPoint {
                    latitude: -4.325,
                    longitude: 15.322,
                }),
                photo_ref: photo_ref.map(str::to_string),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        b
    }

    fn set_status(b: &Breakdown, status: BreakdownStatus) -> Result<Vec<BreakdownEvent>, DomainError> {
        b.handle(&BreakdownCommand::SetBreakdownStatus(SetBreakdownStatus {
            structure: Structure::Gts,
            breakdown_id: b.id_typed(),
            status,
            occurred_at: test_time(),
        }))
    }

    #[test]
    fn report_starts_in_reported_status() {
        let b = reported(None);
        assert_eq!(b.status(), BreakdownStatus::Reported);
    }

    #[test]
    fn forward_transitions_are_allowed() {
        let mut b = reported(None);
        let events = set_status(&b, BreakdownStatus::InProgress).unwrap();
        b.apply(&events[0]);
        let events = set_status(&b, BreakdownStatus::Resolved).unwrap();
        b.apply(&events[0]);
        assert_eq!(b.status(), BreakdownStatus::Resolved);
    }

    #[test]
    fn reported_can_jump_straight_to_resolved() {
        let b = reported(None);
        assert!(set_status(&b, BreakdownStatus::Resolved).is_ok());
    }

    #[test]
    fn resolved_is_terminal() {
        let mut b = reported(None);
        let events = set_status(&b, BreakdownStatus::Resolved).unwrap();
        b.apply(&events[0]);

        for target in [BreakdownStatus::Reported, BreakdownStatus::InProgress] {
            let err = set_status(&b, target).unwrap_err();
            assert!(matches!(err, DomainError::InvariantViolation(_)));
        }
    }

    #[test]
    fn backward_transition_is_rejected() {
        let mut b = reported(None);
        let events = set_status(&b, BreakdownStatus::InProgress).unwrap();
        b.apply(&events[0]);
        let err = set_status(&b, BreakdownStatus::Reported).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn delete_releases_photo_reference() {
        let mut b = reported(Some("doc://photos/brk-17"));
        let events = b
            .handle(&BreakdownCommand::DeleteBreakdown(DeleteBreakdown {
                structure: Structure::Gts,
                breakdown_id: b.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();

        match &events[0] {
            BreakdownEvent::BreakdownDeleted(e) => {
                assert_eq!(e.released_photo_ref.as_deref(), Some("doc://photos/brk-17"));
            }
            other => panic!("expected BreakdownDeleted, got {other:?}"),
        }

        b.apply(&events[0]);
        assert!(b.is_deleted());
        assert_eq!(b.photo_ref(), None);

        let err = set_status(&b, BreakdownStatus::Resolved).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
