//! Expense ledger domain module (event-sourced).
//!
//! Append-only cost entries tied to a vehicle and structure. Entries are
//! never edited or deleted; together with invoice nets they feed the
//! structure-level profit/loss read model.

pub mod expense;

pub use expense::{Expense, ExpenseCommand, ExpenseEvent, ExpenseRecorded, RecordExpense};
