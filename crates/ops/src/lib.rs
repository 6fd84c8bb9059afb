//! Operational unit domain module (event-sourced).
//!
//! An operational unit binds one driver and one vehicle for a unit of work:
//! a calendar **day** accumulating voyages (BATICOM line) or a single
//! point-to-point **mission** with a load/unload phase split (GTS line).
//! Both variants share the one-way closure rule: once closed, no ledger
//! field may change.
//!
//! The two cross-aggregate invariants this module depends on — at most one
//! open day per driver, and vehicle availability at open time — are enforced
//! by the infrastructure guards, not here.

pub mod day;
pub mod mission;

use fleetops_core::UnitId;
use serde::{Deserialize, Serialize};

pub use day::{
    AddFuel, CloseDay, DayClosed, DayOpened, DayUnit, DayUnitCommand, DayUnitEvent, DayUnitStatus,
    FuelAdded, OpenDay, RecordVoyage, RemoveVoyage, Voyage, VoyageRecorded, VoyageRemoved,
};
pub use mission::{
    AdvanceMission, AssignMission, LoadingRecorded, MissionAdvanced, MissionAssigned, MissionUnit,
    MissionUnitCommand, MissionUnitEvent, MissionUnitStatus, RecordLoading, RecordUnloading,
    SetTripCosts, TripCosts, TripCostsSet, UnloadingRecorded,
};

/// Reference to an operational unit, tagged by variant.
///
/// Breakdowns and telemetry samples reference units through this type, which
/// makes the day/mission distinction explicit instead of relying on
/// field-presence checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum UnitRef {
    Day(UnitId),
    Mission(UnitId),
}

impl UnitRef {
    pub fn unit_id(&self) -> UnitId {
        match self {
            UnitRef::Day(id) | UnitRef::Mission(id) => *id,
        }
    }
}

/// Tagged pair of the two unit variants, sharing the closure capability.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationalUnit {
    Day(DayUnit),
    Mission(MissionUnit),
}

impl OperationalUnit {
    pub fn unit_id(&self) -> UnitId {
        match self {
            OperationalUnit::Day(u) => u.id_typed(),
            OperationalUnit::Mission(u) => u.id_typed(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            OperationalUnit::Day(u) => u.status() == DayUnitStatus::Closed,
            OperationalUnit::Mission(u) => u.status() == MissionUnitStatus::Closed,
        }
    }
}
