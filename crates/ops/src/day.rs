use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fleetops_core::{Aggregate, AggregateRoot, DomainError, DriverId, Structure, UnitId, VehicleId};
use fleetops_events::Event;

/// Day-unit status lifecycle: `Open --close--> Closed` (terminal, one-way).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayUnitStatus {
    Open,
    Closed,
}

/// One tonnage-bearing leg within a day unit.
///
/// Ordinals are contiguous 1..N at all times; removing a voyage renumbers
/// the ones after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voyage {
    pub ordinal: u32,
    /// Tonnage carried on this leg, in kilograms. Never negative.
    pub tonnage_kg: i64,
}

/// Aggregate root: DayUnit.
///
/// One driver + one vehicle allocated for a calendar day, accumulating a
/// voyage ledger and fuel top-ups. `voyage_count` and `total_tonnage_kg`
/// are denormalized caches recomputed from the ledger on every mutation —
/// they are never independently writable.
#[derive(Debug, Clone, PartialEq)]
pub struct DayUnit {
    id: UnitId,
    structure: Option<Structure>,
    driver_id: Option<DriverId>,
    vehicle_id: Option<VehicleId>,
    date: Option<NaiveDate>,
    status: DayUnitStatus,
    /// Fuel on hand when the day opened, in litres.
    initial_fuel_l: i64,
    /// Cumulative fuel top-ups during the day, in litres.
    fuel_added_l: i64,
    voyages: Vec<Voyage>,
    voyage_count: u32,
    total_tonnage_kg: i64,
    version: u64,
    created: bool,
}

impl DayUnit {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: UnitId) -> Self {
        Self {
            id,
            structure: None,
            driver_id: None,
            vehicle_id: None,
            date: None,
            status: DayUnitStatus::Open,
            initial_fuel_l: 0,
            fuel_added_l: 0,
            voyages: Vec::new(),
            voyage_count: 0,
            total_tonnage_kg: 0,
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

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn status(&self) -> DayUnitStatus {
        self.status
    }

    pub fn initial_fuel_l(&self) -> i64 {
        self.initial_fuel_l
    }

    pub fn fuel_added_l(&self) -> i64 {
        self.fuel_added_l
    }

    pub fn voyages(&self) -> &[Voyage] {
        &self.voyages
    }

    /// Cached count of voyages with tonnage > 0.
    pub fn voyage_count(&self) -> u32 {
        self.voyage_count
    }

    /// Cached sum of voyage tonnages, in kilograms.
    pub fn total_tonnage_kg(&self) -> i64 {
        self.total_tonnage_kg
    }

    fn recompute_totals(&mut self) {
        self.total_tonnage_kg = self.voyages.iter().map(|v| v.tonnage_kg).sum();
        self.voyage_count = self.voyages.iter().filter(|v| v.tonnage_kg > 0).count() as u32;
    }

    fn renumber(&mut self) {
        for (idx, v) in self.voyages.iter_mut().enumerate() {
            v.ordinal = (idx + 1) as u32;
        }
    }
}

impl AggregateRoot for DayUnit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenDay.
///
/// Vehicle availability and the one-open-day-per-driver invariant are
/// checked by the ops service before this command is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDay {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub date: NaiveDate,
    pub initial_fuel_l: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordVoyage. Tonnage is clamped to >= 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordVoyage {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub tonnage_kg: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveVoyage. Subsequent ordinals renumber to stay contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveVoyage {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub ordinal: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddFuel. Litres <= 0 is a no-op, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFuel {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub liters: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseDay.
///
/// Terminal. Does not revert the vehicle to Available: that is a separate
/// manual operator action after inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseDay {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub closed_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayUnitCommand {
    OpenDay(OpenDay),
    RecordVoyage(RecordVoyage),
    RemoveVoyage(RemoveVoyage),
    AddFuel(AddFuel),
    CloseDay(CloseDay),
}

/// Event: DayOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOpened {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub date: NaiveDate,
    pub initial_fuel_l: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VoyageRecorded (ordinal assigned at decision time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoyageRecorded {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub ordinal: u32,
    pub tonnage_kg: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VoyageRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoyageRemoved {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub ordinal: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FuelAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelAdded {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub liters: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DayClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayClosed {
    pub structure: Structure,
    pub unit_id: UnitId,
    pub closed_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayUnitEvent {
    DayOpened(DayOpened),
    VoyageRecorded(VoyageRecorded),
    VoyageRemoved(VoyageRemoved),
    FuelAdded(FuelAdded),
    DayClosed(DayClosed),
}

impl Event for DayUnitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DayUnitEvent::DayOpened(_) => "ops.day.opened",
            DayUnitEvent::VoyageRecorded(_) => "ops.day.voyage_recorded",
            DayUnitEvent::VoyageRemoved(_) => "ops.day.voyage_removed",
            DayUnitEvent::FuelAdded(_) => "ops.day.fuel_added",
            DayUnitEvent::DayClosed(_) => "ops.day.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DayUnitEvent::DayOpened(e) => e.occurred_at,
            DayUnitEvent::VoyageRecorded(e) => e.occurred_at,
            DayUnitEvent::VoyageRemoved(e) => e.occurred_at,
            DayUnitEvent::FuelAdded(e) => e.occurred_at,
            DayUnitEvent::DayClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DayUnit {
    type Command = DayUnitCommand;
    type Event = DayUnitEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DayUnitEvent::DayOpened(e) => {
                self.id = e.unit_id;
                self.structure = Some(e.structure);
                self.driver_id = Some(e.driver_id);
                self.vehicle_id = Some(e.vehicle_id);
                self.date = Some(e.date);
                self.status = DayUnitStatus::Open;
                self.initial_fuel_l = e.initial_fuel_l;
                self.fuel_added_l = 0;
                self.voyages.clear();
                self.recompute_totals();
                self.created = true;
            }
            DayUnitEvent::VoyageRecorded(e) => {
                self.voyages.push(Voyage {
                    ordinal: e.ordinal,
                    tonnage_kg: e.tonnage_kg,
                });
                self.recompute_totals();
            }
            DayUnitEvent::VoyageRemoved(e) => {
                self.voyages.retain(|v| v.ordinal != e.ordinal);
                self.renumber();
                self.recompute_totals();
            }
            DayUnitEvent::FuelAdded(e) => {
                self.fuel_added_l += e.liters;
            }
            DayUnitEvent::DayClosed(_) => {
                self.status = DayUnitStatus::Closed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DayUnitCommand::OpenDay(cmd) => self.handle_open(cmd),
            DayUnitCommand::RecordVoyage(cmd) => self.handle_record_voyage(cmd),
            DayUnitCommand::RemoveVoyage(cmd) => self.handle_remove_voyage(cmd),
            DayUnitCommand::AddFuel(cmd) => self.handle_add_fuel(cmd),
            DayUnitCommand::CloseDay(cmd) => self.handle_close(cmd),
        }
    }
}

impl DayUnit {
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
        if self.status == DayUnitStatus::Closed {
            return Err(DomainError::closed_unit());
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenDay) -> Result<Vec<DayUnitEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("day unit already opened"));
        }
        if cmd.initial_fuel_l < 0 {
            return Err(DomainError::validation("initial fuel cannot be negative"));
        }
        Ok(vec![DayUnitEvent::DayOpened(DayOpened {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            driver_id: cmd.driver_id,
            vehicle_id: cmd.vehicle_id,
            date: cmd.date,
            initial_fuel_l: cmd.initial_fuel_l,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_voyage(&self, cmd: &RecordVoyage) -> Result<Vec<DayUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        let next_ordinal = self.voyages.len() as u32 + 1;
        Ok(vec![DayUnitEvent::VoyageRecorded(VoyageRecorded {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            ordinal: next_ordinal,
            tonnage_kg: cmd.tonnage_kg.max(0),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_voyage(&self, cmd: &RemoveVoyage) -> Result<Vec<DayUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        if !self.voyages.iter().any(|v| v.ordinal == cmd.ordinal) {
            return Err(DomainError::not_found());
        }

        Ok(vec![DayUnitEvent::VoyageRemoved(VoyageRemoved {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            ordinal: cmd.ordinal,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_fuel(&self, cmd: &AddFuel) -> Result<Vec<DayUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        if cmd.liters <= 0 {
            // Non-positive top-up is a no-op, not an error.
            return Ok(vec![]);
        }

        Ok(vec![DayUnitEvent::FuelAdded(FuelAdded {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            liters: cmd.liters,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseDay) -> Result<Vec<DayUnitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_structure(cmd.structure)?;
        self.ensure_unit_id(cmd.unit_id)?;
        self.ensure_open()?;

        Ok(vec![DayUnitEvent::DayClosed(DayClosed {
            structure: cmd.structure,
            unit_id: cmd.unit_id,
            closed_on: cmd.closed_on,
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
        NaiveDate::from_ymd_opt(2025, 5, 12).unwrap()
    }

    fn open_day_unit() -> DayUnit {
        let id = UnitId::new();
        let mut unit = DayUnit::empty(id);
        execute(
            &mut unit,
            &DayUnitCommand::OpenDay(OpenDay {
                structure: Structure::Baticom,
                unit_id: id,
                driver_id: DriverId::new(),
                vehicle_id: VehicleId::new(),
                date: test_date(),
                initial_fuel_l: 120,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        unit
    }

    fn record(unit: &mut DayUnit, tonnage_kg: i64) {
        execute(
            unit,
            &DayUnitCommand::RecordVoyage(RecordVoyage {
                structure: Structure::Baticom,
                unit_id: unit.id_typed(),
                tonnage_kg,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
    }

    fn assert_totals_consistent(unit: &DayUnit) {
        let sum: i64 = unit.voyages().iter().map(|v| v.tonnage_kg).sum();
        let count = unit.voyages().iter().filter(|v| v.tonnage_kg > 0).count() as u32;
        assert_eq!(unit.total_tonnage_kg(), sum);
        assert_eq!(unit.voyage_count(), count);
    }

    #[test]
    fn voyages_get_contiguous_ordinals_and_consistent_totals() {
        let mut unit = open_day_unit();
        record(&mut unit, 12_000);
        record(&mut unit, 0);
        record(&mut unit, 9_500);

        let ordinals: Vec<u32> = unit.voyages().iter().map(|v| v.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(unit.total_tonnage_kg(), 21_500);
        // Zero-tonnage legs do not count as voyages.
        assert_eq!(unit.voyage_count(), 2);
        assert_totals_consistent(&unit);
    }

    #[test]
    fn negative_tonnage_is_clamped_to_zero() {
        let mut unit = open_day_unit();
        record(&mut unit, -500);
        assert_eq!(unit.voyages()[0].tonnage_kg, 0);
        assert_eq!(unit.total_tonnage_kg(), 0);
        assert_eq!(unit.voyage_count(), 0);
    }

    #[test]
    fn remove_voyage_renumbers_contiguously() {
        let mut unit = open_day_unit();
        record(&mut unit, 1_000);
        record(&mut unit, 2_000);
        record(&mut unit, 3_000);

        let unit_id = unit.id_typed();
        execute(
            &mut unit,
            &DayUnitCommand::RemoveVoyage(RemoveVoyage {
                structure: Structure::Baticom,
                unit_id,
                ordinal: 2,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let ordinals: Vec<u32> = unit.voyages().iter().map(|v| v.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
        let tonnages: Vec<i64> = unit.voyages().iter().map(|v| v.tonnage_kg).collect();
        assert_eq!(tonnages, vec![1_000, 3_000]);
        assert_totals_consistent(&unit);
    }

    #[test]
    fn remove_missing_ordinal_is_not_found_and_leaves_ordinals_alone() {
        let mut unit = open_day_unit();
        record(&mut unit, 1_000);
        record(&mut unit, 2_000);
        let before = unit.clone();

        let err = unit
            .handle(&DayUnitCommand::RemoveVoyage(RemoveVoyage {
                structure: Structure::Baticom,
                unit_id: unit.id_typed(),
                ordinal: 7,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
        assert_eq!(unit, before);
    }

    #[test]
    fn non_positive_fuel_top_up_is_a_no_op() {
        let mut unit = open_day_unit();
        let events = unit
            .handle(&DayUnitCommand::AddFuel(AddFuel {
                structure: Structure::Baticom,
                unit_id: unit.id_typed(),
                liters: 0,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());

        let unit_id = unit.id_typed();
        execute(
            &mut unit,
            &DayUnitCommand::AddFuel(AddFuel {
                structure: Structure::Baticom,
                unit_id,
                liters: 40,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(unit.fuel_added_l(), 40);
    }

    #[test]
    fn closed_day_rejects_all_ledger_mutations() {
        let mut unit = open_day_unit();
        record(&mut unit, 5_000);
        let unit_id = unit.id_typed();
        execute(
            &mut unit,
            &DayUnitCommand::CloseDay(CloseDay {
                structure: Structure::Baticom,
                unit_id,
                closed_on: test_date(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(unit.status(), DayUnitStatus::Closed);
        let before = unit.clone();

        let commands = [
            DayUnitCommand::RecordVoyage(RecordVoyage {
                structure: Structure::Baticom,
                unit_id: unit.id_typed(),
                tonnage_kg: 100,
                occurred_at: test_time(),
            }),
            DayUnitCommand::RemoveVoyage(RemoveVoyage {
                structure: Structure::Baticom,
                unit_id: unit.id_typed(),
                ordinal: 1,
                occurred_at: test_time(),
            }),
            DayUnitCommand::AddFuel(AddFuel {
                structure: Structure::Baticom,
                unit_id: unit.id_typed(),
                liters: 10,
                occurred_at: test_time(),
            }),
            DayUnitCommand::CloseDay(CloseDay {
                structure: Structure::Baticom,
                unit_id: unit.id_typed(),
                closed_on: test_date(),
                occurred_at: test_time(),
            }),
        ];

        for cmd in commands {
            let err = unit.handle(&cmd).unwrap_err();
            assert_eq!(err, DomainError::ClosedUnit, "command: {cmd:?}");
            assert_eq!(unit, before);
        }
    }

    #[test]
    fn negative_initial_fuel_is_rejected() {
        let id = UnitId::new();
        let unit = DayUnit::empty(id);
        let err = unit
            .handle(&DayUnitCommand::OpenDay(OpenDay {
                structure: Structure::Baticom,
                unit_id: id,
                driver_id: DriverId::new(),
                vehicle_id: VehicleId::new(),
                date: test_date(),
                initial_fuel_l: -5,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: after any interleaving of records and removals, the
            /// cached totals equal the recomputed ledger sums and ordinals
            /// stay contiguous 1..N.
            #[test]
            fn cached_totals_match_ledger(ops in prop::collection::vec(
                prop_oneof![
                    (-20_000i64..40_000).prop_map(Ok),
                    (1u32..6).prop_map(Err),
                ],
                0..40,
            )) {
                let mut unit = open_day_unit();
                for op in ops {
                    match op {
                        Ok(tonnage_kg) => record(&mut unit, tonnage_kg),
                        Err(ordinal) => {
                            // Removal of a missing ordinal must not change state.
                            let unit_id = unit.id_typed();
                            let _ = fleetops_events::execute(
                                &mut unit,
                                &DayUnitCommand::RemoveVoyage(RemoveVoyage {
                                    structure: Structure::Baticom,
                                    unit_id,
                                    ordinal,
                                    occurred_at: test_time(),
                                }),
                            );
                        }
                    }

                    assert_totals_consistent(&unit);
                    let ordinals: Vec<u32> =
                        unit.voyages().iter().map(|v| v.ordinal).collect();
                    let expected: Vec<u32> = (1..=ordinals.len() as u32).collect();
                    prop_assert_eq!(ordinals, expected);
                }
            }
        }
    }
}
