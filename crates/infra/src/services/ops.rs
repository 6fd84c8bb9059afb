//! Operational-unit workflows: opening, ledger edits, closure.

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use fleetops_core::{Structure, VehicleId};
use fleetops_events::{EventBus, EventEnvelope};
use fleetops_fleet::{SetVehicleStatus, Vehicle, VehicleCommand, VehicleStatus};
use fleetops_ops::{
    AddFuel, AdvanceMission, AssignMission, CloseDay, DayUnit, DayUnitCommand, MissionUnit,
    MissionUnitCommand, OpenDay, RecordLoading, RecordUnloading, RecordVoyage, RemoveVoyage,
    SetTripCosts,
};

use crate::command_dispatcher::CommandDispatcher;
use crate::constraints::OpenDayGuard;
use crate::event_store::{EventStore, StoredEvent};
use crate::services::{
    AGGREGATE_DAY_UNIT, AGGREGATE_MISSION_UNIT, AGGREGATE_VEHICLE, ServiceError,
};

/// Orchestrates day-unit and mission-unit lifecycles.
///
/// The one-open-day-per-driver invariant is held by the guard, claimed
/// before the open is dispatched and released on closure (or on rollback
/// when the open fails after the claim). Vehicle status transitions are
/// explicit: opening a unit sets the vehicle OnAssignment; closure never
/// reverts it, the revert is a separate operator action.
#[derive(Debug)]
pub struct OpsService<S, B, G> {
    dispatcher: CommandDispatcher<S, B>,
    open_day_guard: G,
}

impl<S, B, G> OpsService<S, B, G> {
    pub fn new(dispatcher: CommandDispatcher<S, B>, open_day_guard: G) -> Self {
        Self {
            dispatcher,
            open_day_guard,
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }
}

impl<S, B, G> OpsService<S, B, G>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    G: OpenDayGuard,
{
    fn ensure_selectable(
        &self,
        structure: Structure,
        vehicle_id: VehicleId,
    ) -> Result<(), ServiceError> {
        let vehicle = self
            .dispatcher
            .load(structure, vehicle_id.into(), |_| Vehicle::empty(vehicle_id))?;
        if !vehicle.is_selectable() {
            // Covers both "not Available" and the race where another unit
            // claimed the vehicle between listing and opening.
            return Err(ServiceError::InvalidVehicle(
                "vehicle no longer available".to_string(),
            ));
        }
        Ok(())
    }

    fn assign_vehicle(
        &self,
        structure: Structure,
        vehicle_id: VehicleId,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), ServiceError> {
        self.dispatcher.dispatch::<Vehicle>(
            structure,
            vehicle_id.into(),
            AGGREGATE_VEHICLE,
            VehicleCommand::SetVehicleStatus(SetVehicleStatus {
                structure,
                vehicle_id,
                status: VehicleStatus::OnAssignment,
                occurred_at,
            }),
            |_| Vehicle::empty(vehicle_id),
        )?;
        Ok(())
    }

    /// Open a day-unit for a driver.
    ///
    /// Fails with `Conflict` if the driver already has an open day, with
    /// `InvalidVehicle` if the vehicle is not Available. On success the
    /// vehicle is set OnAssignment. If the vehicle transition fails after
    /// the open has committed, the day is closed back out and the driver
    /// slot is released, so a rejected open never leaves an allocation
    /// behind.
    pub fn open_day(&self, cmd: OpenDay) -> Result<Vec<StoredEvent>, ServiceError> {
        self.ensure_selectable(cmd.structure, cmd.vehicle_id)?;

        self.open_day_guard
            .reserve(cmd.structure, cmd.driver_id, cmd.unit_id)?;

        let unit_id = cmd.unit_id;
        let structure = cmd.structure;
        let driver_id = cmd.driver_id;
        let vehicle_id = cmd.vehicle_id;
        let date = cmd.date;
        let occurred_at = cmd.occurred_at;

        let committed = match self.dispatcher.dispatch::<DayUnit>(
            structure,
            unit_id.into(),
            AGGREGATE_DAY_UNIT,
            DayUnitCommand::OpenDay(cmd),
            |_| DayUnit::empty(unit_id),
        ) {
            Ok(committed) => committed,
            Err(e) => {
                // Roll the claim back; nothing was appended.
                self.open_day_guard.release(structure, driver_id);
                return Err(e.into());
            }
        };

        if let Err(e) = self.assign_vehicle(structure, vehicle_id, occurred_at) {
            // The day open is already committed. Close it back out and free
            // the driver slot so a rejected open leaves nothing allocated.
            let compensation = self.dispatcher.dispatch::<DayUnit>(
                structure,
                unit_id.into(),
                AGGREGATE_DAY_UNIT,
                DayUnitCommand::CloseDay(CloseDay {
                    structure,
                    unit_id,
                    closed_on: date,
                    occurred_at,
                }),
                |_| DayUnit::empty(unit_id),
            );
            if let Err(close_err) = compensation {
                warn!(%unit_id, error = ?close_err, "compensating close failed after vehicle allocation failure");
            }
            self.open_day_guard.release(structure, driver_id);
            return Err(e);
        }

        info!(%unit_id, %driver_id, %vehicle_id, "day unit opened");
        Ok(committed)
    }

    pub fn record_voyage(&self, cmd: RecordVoyage) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        Ok(self.dispatcher.dispatch::<DayUnit>(
            cmd.structure,
            unit_id.into(),
            AGGREGATE_DAY_UNIT,
            DayUnitCommand::RecordVoyage(cmd),
            |_| DayUnit::empty(unit_id),
        )?)
    }

    pub fn remove_voyage(&self, cmd: RemoveVoyage) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        Ok(self.dispatcher.dispatch::<DayUnit>(
            cmd.structure,
            unit_id.into(),
            AGGREGATE_DAY_UNIT,
            DayUnitCommand::RemoveVoyage(cmd),
            |_| DayUnit::empty(unit_id),
        )?)
    }

    pub fn add_fuel(&self, cmd: AddFuel) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        Ok(self.dispatcher.dispatch::<DayUnit>(
            cmd.structure,
            unit_id.into(),
            AGGREGATE_DAY_UNIT,
            DayUnitCommand::AddFuel(cmd),
            |_| DayUnit::empty(unit_id),
        )?)
    }

    /// Close a day-unit and release the driver's open slot.
    ///
    /// The vehicle keeps its OnAssignment status; reverting it to
    /// Available is the operator's `release_vehicle` call after
    /// inspection.
    pub fn close_day(&self, cmd: CloseDay) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        let structure = cmd.structure;

        // Need the driver to free the right slot afterwards.
        let unit = self
            .dispatcher
            .load(structure, unit_id.into(), |_| DayUnit::empty(unit_id))?;
        let driver_id = unit.driver_id().ok_or(ServiceError::NotFound)?;

        let committed = self.dispatcher.dispatch::<DayUnit>(
            structure,
            unit_id.into(),
            AGGREGATE_DAY_UNIT,
            DayUnitCommand::CloseDay(cmd),
            |_| DayUnit::empty(unit_id),
        )?;

        self.open_day_guard.release(structure, driver_id);
        info!(%unit_id, %driver_id, "day unit closed");
        Ok(committed)
    }

    /// Manual operator revert of a vehicle back to Available.
    pub fn release_vehicle(
        &self,
        structure: Structure,
        vehicle_id: VehicleId,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        Ok(self.dispatcher.dispatch::<Vehicle>(
            structure,
            vehicle_id.into(),
            AGGREGATE_VEHICLE,
            VehicleCommand::SetVehicleStatus(SetVehicleStatus {
                structure,
                vehicle_id,
                status: VehicleStatus::Available,
                occurred_at,
            }),
            |_| Vehicle::empty(vehicle_id),
        )?)
    }

    /// Assign a mission-unit. Allocates the vehicle the same way as
    /// `open_day`, but missions carry no per-driver open-slot invariant.
    pub fn assign_mission(&self, cmd: AssignMission) -> Result<Vec<StoredEvent>, ServiceError> {
        self.ensure_selectable(cmd.structure, cmd.vehicle_id)?;

        let unit_id = cmd.unit_id;
        let structure = cmd.structure;
        let vehicle_id = cmd.vehicle_id;
        let occurred_at = cmd.occurred_at;

        let committed = self.dispatcher.dispatch::<MissionUnit>(
            structure,
            unit_id.into(),
            AGGREGATE_MISSION_UNIT,
            MissionUnitCommand::AssignMission(cmd),
            |_| MissionUnit::empty(unit_id),
        )?;

        self.assign_vehicle(structure, vehicle_id, occurred_at)?;
        Ok(committed)
    }

    pub fn advance_mission(&self, cmd: AdvanceMission) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        Ok(self.dispatcher.dispatch::<MissionUnit>(
            cmd.structure,
            unit_id.into(),
            AGGREGATE_MISSION_UNIT,
            MissionUnitCommand::AdvanceMission(cmd),
            |_| MissionUnit::empty(unit_id),
        )?)
    }

    pub fn record_loading(&self, cmd: RecordLoading) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        Ok(self.dispatcher.dispatch::<MissionUnit>(
            cmd.structure,
            unit_id.into(),
            AGGREGATE_MISSION_UNIT,
            MissionUnitCommand::RecordLoading(cmd),
            |_| MissionUnit::empty(unit_id),
        )?)
    }

    /// Record the unloading phase. Closes the mission atomically; a
    /// failure here leaves the mission open and untouched.
    pub fn record_unloading(&self, cmd: RecordUnloading) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        let committed = self.dispatcher.dispatch::<MissionUnit>(
            cmd.structure,
            unit_id.into(),
            AGGREGATE_MISSION_UNIT,
            MissionUnitCommand::RecordUnloading(cmd),
            |_| MissionUnit::empty(unit_id),
        )?;
        if !committed.is_empty() {
            warn!(%unit_id, "mission closed via unloading; vehicle revert pending");
        }
        Ok(committed)
    }

    pub fn set_trip_costs(&self, cmd: SetTripCosts) -> Result<Vec<StoredEvent>, ServiceError> {
        let unit_id = cmd.unit_id;
        Ok(self.dispatcher.dispatch::<MissionUnit>(
            cmd.structure,
            unit_id.into(),
            AGGREGATE_MISSION_UNIT,
            MissionUnitCommand::SetTripCosts(cmd),
            |_| MissionUnit::empty(unit_id),
        )?)
    }
}
