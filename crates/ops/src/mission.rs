use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fleetops_core::{Aggregate, AggregateRoot, DomainError, DriverId, Structure, UnitId, VehicleId};
use fleetops_events::Event;

/// Mission status sequence: Assigned → InProgress → AtDestination →
/// Returning → Closed.
///
/// Intermediate statuses advance forward one step at a time; `Closed` is
/// reached only through the unloading submission, never by advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionUnitStatus {
    Assigned,
    InProgress,
    AtDestination,
    Returning,
    Closed,
}

impl MissionUnitStatus {
    fn next(self) -> Option<MissionUnitStatus> {
        match self {
            MissionUnitStatus::Assigned => Some(MissionUnitStatus::InProgress),
            MissionUnitStatus::InProgress => Some(MissionUnitStatus::AtDestination),
            MissionUnitStatus::AtDestination => Some(MissionUnitStatus::Returning),
            // Returning ends via unloading, not by advancing.
            MissionUnitStatus::Returning | MissionUnitStatus::Closed => None,
        }
    }
}

/// Trip-related cost fields, in smallest currency unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripCosts {
    pub fuel: i64,
    pub road_fees: i64,
    pub other: i64,
}

/// Aggregate root: MissionUnit.
///
/// One driver + one vehicle allocated for a single point-to-point trip with
/// a two-phase edit contract: while nothing is loaded, only the loading side
/// (tonnage + load report) may be written; once loaded, only the unloading
/// side may be written, and submitting it closes the mission atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionUnit {
    id: UnitId,
    structure: Option<Structure>,
    driver_id: Option<DriverId>,
    vehicle_id: Option<VehicleId>,
    title: String,
    status: MissionUnitStatus,
    tonnage_loaded_kg: i64,
    tonnage_unloaded_kg: i64,
    load_report: Option<String>,
    unload_report: Option<String>,
    trip_costs: TripCosts,
    closed_on: Option<NaiveDate>,
    version: u64,
    created: bool,
}

impl MissionUnit {
    /// Create an empty, not-yet-assigned aggregate instance for rehydration.
    pub fn empty(id: UnitId) -> Self {
        Self {
            id,
            structure: None,
            driver_id: None,
            vehicle_id: None,
            title: String::new(),
            status: MissionUnitStatus::Assigned,
            tonnage_loaded_kg: 0,
            tonnage_unloaded_kg: 0,
            load_report: None,
            unload_report: None,
            trip_costs: TripCosts::default(),
            closed_on: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> UnitId {
        self.id
    }

    pub fn structure(&self) -> Option<Structure> {
        self.structure
    }

    pub fn driver_id(&self) -> Option<DriverId> {
        self.driver_id
    }

    pub fn vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> MissionUnitStatus {
        self.status
    }

    pub fn tonnage_loaded_kg(&self) -> i64 {
        self.tonnage_loaded_kg
    }

    pub fn tonnage_unloaded_kg(&self) -> i64 {
        self.tonnage_unloaded_kg
    }

    pub fn load_report(&self) -> Option<&str> {
        self.load_report.as_deref()
    }

    pub fn unload_report(&self) -> Option<&str> {
        self.unload_report.as_deref()
    }

    pub fn trip_costs(&self) -> TripCosts {
        self.trip_costs
    }

    pub fn closed_on(&self) -> Option<NaiveDate> {
        self.closed_on
    }

    /// Phase check for the two-phase edit contract.
    pub fn is_loaded(&self) -> bool {
        self.tonnage_loaded_kg > 0
    }
}

impl AggregateRoot for MissionUnit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AssignMission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignMission {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdvanceMission (one forward step through the status sequence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceMission {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordLoading (phase one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLoading {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub tonnage_kg: i64,
    pub report: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordUnloading (phase two; closes the mission atomically).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUnloading {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub tonnage_kg: i64,
    pub report: String,
    pub closed_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetTripCosts (whole-record replace of the cost fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTripCosts {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub costs: TripCosts,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionUnitCommand {
    AssignMission(AssignMission),
    AdvanceMission(AdvanceMission),
    RecordLoading(RecordLoading),
    RecordUnloading(RecordUnloading),
    SetTripCosts(SetTripCosts),
}

/// Event: MissionAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionAssigned {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MissionAdvanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionAdvanced {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub status: MissionUnitStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoadingRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingRecorded {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub tonnage_kg: i64,
    pub report: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnloadingRecorded (carries the closure date; closes the mission).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnloadingRecorded {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub tonnage_kg: i64,
    pub report: String,
    pub closed_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TripCostsSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripCostsSet {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub costs: TripCosts,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionUnitEvent {
    MissionAssigned(MissionAssigned),
    MissionAdvanced(MissionAdvanced),
    LoadingRecorded(LoadingRecorded),
    UnloadingRecorded(UnloadingRecorded),
    TripCostsSet(TripCostsSet),
}

impl Event for MissionUnitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MissionUnitEvent::MissionAssigned(_) => "ops.mission.assigned",
            MissionUnitEvent::MissionAdvanced(_) => "ops.mission.advanced",
            MissionUnitEvent::LoadingRecorded(_) => "ops.mission.loading_recorded",
            MissionUnitEvent::UnloadingRecorded(_) => "ops.mission.unloading_recorded",
            MissionUnitEvent::TripCostsSet(_) => "ops.mission.trip_costs_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MissionUnitEvent::MissionAssigned(e) => e.occurred_at,
            MissionUnitEvent::MissionAdvanced(e) => e.occurred_at,
            MissionUnitEvent::LoadingRecorded(e) => e.occurred_at,
            MissionUnitEvent::UnloadingRecorded(e) => e.occurred_at,
            MissionUnitEvent::TripCostsSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for MissionUnit {
    type Command = MissionUnitCommand;
    type Event = MissionUnitEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MissionUnitEvent::MissionAssigned(e) => {
                self.id = e.unit_id;
                self.structure = Some(e.structure);
                self.driver_id = Some(e.driver_id);
                self.vehicle_id = Some(e.vehicle_id);
                self.title = e.title.clone();
                self.status = MissionUnitStatus::Assigned;
                self.created = true;
            }
            MissionUnitEvent::MissionAdvanced(e) => {
                self.status = e.status;
            }
            MissionUnitEvent::LoadingRecorded(e) => {
                self.tonnage_loaded_kg = e.tonnage_kg;
                self.load_report = Some(e.report.clone());
            }
            MissionUnitEvent::UnloadingRecorded(e) => {
                self.tonnage_unloaded_kg = e.tonnage_kg;
                self.unload_report = Some(e.report.clone());
                self.closed_on = Some(e.closed_on);
                self.status = MissionUnitStatus::Closed;
            }
            MissionUnitEvent::TripCostsSet(e) => {
                self.trip_costs = e.costs;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MissionUnitCommand::AssignMission(cmd) => self.handle_assign(cmd),
            MissionUnitCommand::AdvanceMission(cmd) => self.handle_advance(cmd),
            MissionUnitCommand::RecordLoading(cmd) => self.handle_loading(cmd),
            MissionUnitCommand::RecordUnloading(cmd) => self.handle_unloading(cmd),
            MissionUnitCommand::SetTripCosts(cmd) => self.handle_costs(cmd),
        }
    }
}

impl MissionUnit {
    fn ensure_structure(&self, structure: Structure) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.structure != Some(structure) {
            return Err(DomainError::invariant("structure mismatch"));
        }
        Ok(())
    }

    fn ensure_unit_id(&self, unit_id: UnitId) -> Result<(), DomainError> {
        if self.id != unit_id {
            return Err(DomainError::invariant("unit_id mismatch"));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.status == MissionUnitStatus::Closed {
            return Err(DomainError::closed_unit());
        }
        Ok(())
    }

    fn handle_assign(&self, cmd: &AssignMission) -> Result<Vec<MissionUnitEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("mission already assigned"));
        }
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("mission title cannot be empty"));
        }
        Ok(vec![MissionUnitEvent::MissionAssigned(MissionAssigned {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            driver_id: cmd.driver_id,
            vehicle_id: cmd.vehicle_id,
            title: cmd.title.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_advance(&self, cmd: &AdvanceMission) -> Result<Vec<MissionUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        let next = self.status.next().ok_or_else(|| {
            DomainError::invariant("mission can only close through unloading submission")
        })?;

        Ok(vec![MissionUnitEvent::MissionAdvanced(MissionAdvanced {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            status: next,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_loading(&self, cmd: &RecordLoading) -> Result<Vec<MissionUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        if self.is_loaded() {
            return Err(DomainError::conflict(
                "loading already recorded; only the unloading side may be edited",
            ));
        }
        if cmd.tonnage_kg <= 0 {
            return Err(DomainError::validation("loaded tonnage must be positive"));
        }

        Ok(vec![MissionUnitEvent::LoadingRecorded(LoadingRecorded {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            tonnage_kg: cmd.tonnage_kg,
            report: cmd.report.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unloading(
        &self,
        cmd: &RecordUnloading,
    ) -> Result<Vec<MissionUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        if !self.is_loaded() {
            return Err(DomainError::invariant(
                "cannot record unloading before loading",
            ));
        }
        if cmd.tonnage_kg < 0 {
            return Err(DomainError::validation(
                "unloaded tonnage cannot be negative",
            ));
        }

        Ok(vec![MissionUnitEvent::UnloadingRecorded(
            UnloadingRecorded {
                structure: cmd.structure,
                unit_id: cmd.unit_id,
                tonnage_kg: cmd.tonnage_kg,
                report: cmd.report.clone(),
                closed_on: cmd.closed_on,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_costs(&self, cmd: &SetTripCosts) -> Result<Vec<MissionUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        let c = cmd.costs;
        if c.fuel < 0 || c.road_fees < 0 || c.other < 0 {
            return Err(DomainError::validation("trip costs cannot be negative"));
        }

        Ok(vec![MissionUnitEvent::TripCostsSet(TripCostsSet {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            costs: cmd.costs,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetops_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
    }

    fn assigned_mission() -> MissionUnit {
        let id = UnitId::new();
        let mut mission = MissionUnit::empty(id);
        execute(
            &mut mission,
            &MissionUnitCommand::AssignMission(AssignMission {
                structure: Structure::Gts,
                unit_id: id,
                driver_id: DriverId::new(),
                vehicle_id: VehicleId::new(),
                title: "Kinshasa -> Matadi clinker".to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        mission
    }

    fn load(mission: &mut MissionUnit, tonnage_kg: i64) {
        execute(
            mission,
            &MissionUnitCommand::RecordLoading(RecordLoading {
                structure: Structure::Gts,
                unit_id: mission.id_typed(),
                tonnage_kg,
                report: "loaded at quay 3".to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
    }

    #[test]
    fn status_advances_forward_only_and_never_into_closed() {
        let mut mission = assigned_mission();
        let advance = |m: &mut MissionUnit| {
            execute(
                m,
                &MissionUnitCommand::AdvanceMission(AdvanceMission {
                    structure: Structure::Gts,
                    unit_id: m.id_typed(),
                    occurred_at: test_time(),
                }),
            )
        };

        advance(&mut mission).unwrap();
        assert_eq!(mission.status(), MissionUnitStatus::InProgress);
        advance(&mut mission).unwrap();
        assert_eq!(mission.status(), MissionUnitStatus::AtDestination);
        advance(&mut mission).unwrap();
        assert_eq!(mission.status(), MissionUnitStatus::Returning);

        let err = advance(&mut mission).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(mission.status(), MissionUnitStatus::Returning);
    }

    #[test]
    fn unloading_before_loading_is_rejected() {
        let mission = assigned_mission();
        let err = mission
            .handle(&MissionUnitCommand::RecordUnloading(RecordUnloading {
                structure: Structure::Gts,
                unit_id: mission.id_typed(),
                tonnage_kg: 10_000,
                report: "unloaded".to_string(),
                closed_on: test_date(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn second_loading_is_rejected_once_loaded() {
        let mut mission = assigned_mission();
        load(&mut mission, 24_000);
        let err = mission
            .handle(&MissionUnitCommand::RecordLoading(RecordLoading {
                structure: Structure::Gts,
                unit_id: mission.id_typed(),
                tonnage_kg: 30_000,
                report: "reloaded".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(mission.tonnage_loaded_kg(), 24_000);
    }

    #[test]
    fn unloading_closes_atomically_with_closure_date() {
        let mut mission = assigned_mission();
        load(&mut mission, 24_000);

        let unit_id = mission.id_typed();
        execute(
            &mut mission,
            &MissionUnitCommand::RecordUnloading(RecordUnloading {
                structure: Structure::Gts,
                unit_id,
                tonnage_kg: 23_800,
                report: "unloaded, 200kg moisture loss".to_string(),
                closed_on: test_date(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(mission.status(), MissionUnitStatus::Closed);
        assert_eq!(mission.closed_on(), Some(test_date()));
        assert_eq!(mission.tonnage_unloaded_kg(), 23_800);
    }

    #[test]
    fn closed_mission_rejects_every_edit() {
        let mut mission = assigned_mission();
        load(&mut mission, 24_000);
        let unit_id = mission.id_typed();
        execute(
            &mut mission,
            &MissionUnitCommand::RecordUnloading(RecordUnloading {
                structure: Structure::Gts,
                unit_id,
                tonnage_kg: 24_000,
                report: "done".to_string(),
                closed_on: test_date(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        let before = mission.clone();

        let commands = [
            MissionUnitCommand::AdvanceMission(AdvanceMission {
                structure: Structure::Gts,
                unit_id: mission.id_typed(),
                occurred_at: test_time(),
            }),
            MissionUnitCommand::RecordLoading(RecordLoading {
                structure: Structure::Gts,
                unit_id: mission.id_typed(),
                tonnage_kg: 1,
                report: "x".to_string(),
                occurred_at: test_time(),
            }),
            MissionUnitCommand::RecordUnloading(RecordUnloading {
                structure: Structure::Gts,
                unit_id: mission.id_typed(),
                tonnage_kg: 1,
                report: "x".to_string(),
                closed_on: test_date(),
                occurred_at: test_time(),
            }),
            MissionUnitCommand::SetTripCosts(SetTripCosts {
                structure: Structure::Gts,
                unit_id: mission.id_typed(),
                costs: TripCosts {
                    fuel: 1,
                    road_fees: 0,
                    other: 0,
                },
                occurred_at: test_time(),
            }),
        ];

        for cmd in commands {
            let err = mission.handle(&cmd).unwrap_err();
            assert_eq!(err, DomainError::ClosedUnit, "command: {cmd:?}");
            assert_eq!(mission, before);
        }
    }

    #[test]
    fn trip_costs_replace_wholesale_while_open() {
        let mut mission = assigned_mission();
        let unit_id = mission.id_typed();
        execute(
            &mut mission,
            &MissionUnitCommand::SetTripCosts(SetTripCosts {
                structure: Structure::Gts,
                unit_id,
                costs: TripCosts {
                    fuel: 180_000,
                    road_fees: 45_000,
                    other: 0,
                },
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(mission.trip_costs().fuel, 180_000);
        assert_eq!(mission.trip_costs().road_fees, 45_000);
    }
}
