use std::collections::HashMap;
use std::sync::Mutex;

use fleetops_core::{DriverId, Structure, UnitId};

use super::ConstraintViolation;

/// Partial-unique guard: at most one Open day-unit per driver.
///
/// `reserve` is the atomic claim; it fails if the driver already holds an
/// open unit, regardless of which caller opened it. `release` happens on
/// day closure, and on rollback when a reserved open fails downstream.
pub trait OpenDayGuard: Send + Sync {
    /// Claim the open slot for a driver. Atomic: of two concurrent calls
    /// for the same driver, exactly one succeeds.
    fn reserve(
        &self,
        structure: Structure,
        driver_id: DriverId,
        unit_id: UnitId,
    ) -> Result<(), ConstraintViolation>;

    /// Release the driver's open slot. Releasing a slot that is not held
    /// is a no-op.
    fn release(&self, structure: Structure, driver_id: DriverId);

    /// The unit currently holding the driver's open slot, if any.
    fn open_unit(&self, structure: Structure, driver_id: DriverId) -> Option<UnitId>;
}

impl<G> OpenDayGuard for std::sync::Arc<G>
where
    G: OpenDayGuard + ?Sized,
{
    fn reserve(
        &self,
        structure: Structure,
        driver_id: DriverId,
        unit_id: UnitId,
    ) -> Result<(), ConstraintViolation> {
        (**self).reserve(structure, driver_id, unit_id)
    }

    fn release(&self, structure: Structure, driver_id: DriverId) {
        (**self).release(structure, driver_id)
    }

    fn open_unit(&self, structure: Structure, driver_id: DriverId) -> Option<UnitId> {
        (**self).open_unit(structure, driver_id)
    }
}

/// In-memory guard backed by a mutex (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryOpenDayGuard {
    open: Mutex<HashMap<(Structure, DriverId), UnitId>>,
}

impl InMemoryOpenDayGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OpenDayGuard for InMemoryOpenDayGuard {
    fn reserve(
        &self,
        structure: Structure,
        driver_id: DriverId,
        unit_id: UnitId,
    ) -> Result<(), ConstraintViolation> {
        let mut open = self
            .open
            .lock()
            .map_err(|_| ConstraintViolation::Unavailable)?;
        if open.contains_key(&(structure, driver_id)) {
            return Err(ConstraintViolation::DuplicateOpenDay);
        }
        open.insert((structure, driver_id), unit_id);
        Ok(())
    }

    fn release(&self, structure: Structure, driver_id: DriverId) {
        if let Ok(mut open) = self.open.lock() {
            open.remove(&(structure, driver_id));
        }
    }

    fn open_unit(&self, structure: Structure, driver_id: DriverId) -> Option<UnitId> {
        self.open
            .lock()
            .ok()
            .and_then(|open| open.get(&(structure, driver_id)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_reserve_for_same_driver_conflicts() {
        let guard = InMemoryOpenDayGuard::new();
        let driver = DriverId::new();

        guard
            .reserve(Structure::Gts, driver, UnitId::new())
            .unwrap();
        let err = guard
            .reserve(Structure::Gts, driver, UnitId::new())
            .unwrap_err();
        assert_eq!(err, ConstraintViolation::DuplicateOpenDay);
    }

    #[test]
    fn release_frees_the_slot() {
        let guard = InMemoryOpenDayGuard::new();
        let driver = DriverId::new();

        guard
            .reserve(Structure::Gts, driver, UnitId::new())
            .unwrap();
        guard.release(Structure::Gts, driver);
        assert!(guard.open_unit(Structure::Gts, driver).is_none());
        assert!(guard.reserve(Structure::Gts, driver, UnitId::new()).is_ok());
    }

    #[test]
    fn slots_are_scoped_per_structure() {
        let guard = InMemoryOpenDayGuard::new();
        let driver = DriverId::new();

        guard
            .reserve(Structure::Gts, driver, UnitId::new())
            .unwrap();
        // Same driver under the other structure is an independent slot.
        assert!(
            guard
                .reserve(Structure::Baticom, driver, UnitId::new())
                .is_ok()
        );
    }

    #[test]
    fn release_of_unheld_slot_is_a_no_op() {
        let guard = InMemoryOpenDayGuard::new();
        guard.release(Structure::Gts, DriverId::new());
    }
}
