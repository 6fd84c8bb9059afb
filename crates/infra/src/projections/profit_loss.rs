use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use fleetops_billing::InvoiceEvent;
use fleetops_core::{AggregateId, ExpenseId, InvoiceId, Structure};
use fleetops_events::EventEnvelope;
use fleetops_expenses::ExpenseEvent;

use crate::read_model::StructureStore;
use crate::services::{AGGREGATE_EXPENSE, AGGREGATE_INVOICE};

/// Structure-level profit/loss position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfitLossSummary {
    /// Sum of net totals over non-cancelled invoices.
    pub invoiced_net: i64,
    /// Sum of the append-only expense ledger.
    pub expense_total: i64,
}

impl ProfitLossSummary {
    pub fn net_position(&self) -> i64 {
        self.invoiced_net - self.expense_total
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    structure: Structure,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum ProfitLossProjectionError {
    #[error("failed to deserialize billing event: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Profit/loss projection: invoice nets against the expense ledger.
///
/// Consumes both invoice and expense streams. Cancelled invoices drop out
/// of the position; whole-document replaces swap the invoice's net in
/// place. Expenses are append-only and only ever accumulate.
#[derive(Debug)]
pub struct ProfitLossProjection<I, E>
where
    I: StructureStore<InvoiceId, i64>,
    E: StructureStore<ExpenseId, i64>,
{
    invoice_nets: I,
    expenses: E,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<I, E> ProfitLossProjection<I, E>
where
    I: StructureStore<InvoiceId, i64>,
    E: StructureStore<ExpenseId, i64>,
{
    pub fn new(invoice_nets: I, expenses: E) -> Self {
        Self {
            invoice_nets,
            expenses,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn summary(&self, structure: Structure) -> ProfitLossSummary {
        ProfitLossSummary {
            invoiced_net: self.invoice_nets.list(structure).into_iter().sum(),
            expense_total: self.expenses.list(structure).into_iter().sum(),
        }
    }

    /// Apply a published envelope into the projection.
    ///
    /// Idempotent per stream cursor; envelopes for unrelated aggregate
    /// types are skipped.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProfitLossProjectionError> {
        let aggregate_type = envelope.aggregate_type();
        if aggregate_type != AGGREGATE_INVOICE && aggregate_type != AGGREGATE_EXPENSE {
            return Ok(());
        }

        let structure = envelope.structure();
        let seq = envelope.sequence_number();

        let mut cursors = match self.cursors.write() {
            Ok(c) => c,
            Err(_) => return Ok(()),
        };
        let key = CursorKey {
            structure,
            aggregate_id: envelope.aggregate_id(),
        };
        let last = *cursors.get(&key).unwrap_or(&0);
        if seq == 0 {
            return Err(ProfitLossProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }

        if aggregate_type == AGGREGATE_INVOICE {
            let event: InvoiceEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProfitLossProjectionError::Deserialize(e.to_string()))?;
            match event {
                InvoiceEvent::InvoiceCreated(e) => {
                    self.invoice_nets
                        .upsert(structure, e.invoice_id, e.net_total);
                }
                InvoiceEvent::InvoiceContentsReplaced(e) => {
                    self.invoice_nets
                        .upsert(structure, e.invoice_id, e.net_total);
                }
                InvoiceEvent::InvoiceCancelled(e) => {
                    self.invoice_nets.remove(structure, &e.invoice_id);
                }
                // Settlement moves money, not the position.
                InvoiceEvent::InvoiceSettled(_) => {}
            }
        } else {
            let event: ExpenseEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProfitLossProjectionError::Deserialize(e.to_string()))?;
            match event {
                ExpenseEvent::ExpenseRecorded(e) => {
                    self.expenses.upsert(structure, e.expense_id, e.amount);
                }
            }
        }

        cursors.insert(key, seq);
        Ok(())
    }

    /// Rebuild from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        structure: Structure,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProfitLossProjectionError> {
        self.invoice_nets.clear_structure(structure);
        self.expenses.clear_structure(structure);
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
