use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fleetops_core::{Aggregate, AggregateRoot, DomainError, ExpenseId, Structure, VehicleId};
use fleetops_events::Event;

/// Aggregate root: Expense.
///
/// One immutable cost entry. The aggregate exists so expenses flow through
/// the same store/bus pipeline as everything else; after `RecordExpense`
/// there are no further commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    id: ExpenseId,
    structure: Option<Structure>,
    vehicle_id: Option<VehicleId>,
    description: String,
    /// Amount in smallest currency unit.
    amount: i64,
    date: Option<NaiveDate>,
    version: u64,
    created: bool,
}

impl Expense {
    /// Create an empty, not-yet-recorded aggregate instance for rehydration.
    pub fn empty(id: ExpenseId) -> Self {
        Self {
            id,
            structure: None,
            vehicle_id: None,
            description: String::new(),
            amount: 0,
            date: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ExpenseId {
        self.id
    }

    pub fn structure(&self) -> Option<Structure> {
        self.structure
    }

    pub fn vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

impl AggregateRoot for Expense {
    type Id = ExpenseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordExpense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordExpense {
    pub structure: Structure,
    pub expense_id: ExpenseId,
    pub vehicle_id: VehicleId,
    pub description: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseCommand {
    RecordExpense(RecordExpense),
}

/// Event: ExpenseRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecorded {
    pub structure: Structure,
    pub expense_id: ExpenseId,
    pub vehicle_id: VehicleId,
    pub description: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseEvent {
    ExpenseRecorded(ExpenseRecorded),
}

impl Event for ExpenseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExpenseEvent::ExpenseRecorded(_) => "expenses.expense.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ExpenseEvent::ExpenseRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Expense {
    type Command = ExpenseCommand;
    type Event = ExpenseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ExpenseEvent::ExpenseRecorded(e) => {
                self.id = e.expense_id;
                self.structure = Some(e.structure);
                self.vehicle_id = Some(e.vehicle_id);
                self.description = e.description.clone();
                self.amount = e.amount;
                self.date = Some(e.date);
                self.created = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ExpenseCommand::RecordExpense(cmd) => self.handle_record(cmd),
        }
    }
}

impl Expense {
    fn handle_record(&self, cmd: &RecordExpense) -> Result<Vec<ExpenseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("expense already recorded"));
        }
        if cmd.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        if cmd.amount <= 0 {
            return Err(DomainError::validation("amount must be positive"));
        }
        Ok(vec![ExpenseEvent::ExpenseRecorded(ExpenseRecorded {
            structure: cmd.structure,
            expense_id: cmd.expense_id,
            vehicle_id: cmd.vehicle_id,
            description: cmd.description.clone(),
            amount: cmd.amount,
            date: cmd.date,
            occurred_at: cmd.occurred_at,
        })])
    }
}
