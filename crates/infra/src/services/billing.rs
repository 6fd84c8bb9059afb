//! Invoice creation workflow: numbering claim with bounded retry.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use fleetops_billing::{
    CancelInvoice, CreateInvoice, Invoice, InvoiceCommand, InvoiceComputation, MarkSettled,
    ReplaceInvoiceContents, next_invoice_number,
};
use fleetops_core::{InvoiceId, Structure};
use fleetops_events::{EventBus, EventEnvelope};
use fleetops_expenses::{Expense, ExpenseCommand, RecordExpense};

use crate::command_dispatcher::CommandDispatcher;
use crate::constraints::{ConstraintViolation, InvoiceNumberGuard};
use crate::event_store::{EventStore, StoredEvent};
use crate::services::{AGGREGATE_EXPENSE, AGGREGATE_INVOICE, ServiceError};

/// Collision retry cap for number generation. Collisions only happen under
/// concurrent creation in the same period, so a handful of attempts is
/// plenty; past that something is wrong and we surface a hard failure.
const MAX_NUMBER_ATTEMPTS: u32 = 5;

/// Orchestrates invoice creation and lifecycle.
///
/// The number sequence scan is advisory; the guard claim is the
/// authoritative uniqueness check. On a claim collision the service
/// rescans (the winner's number is now visible) and retries, up to
/// [`MAX_NUMBER_ATTEMPTS`].
#[derive(Debug)]
pub struct BillingService<S, B, G> {
    dispatcher: CommandDispatcher<S, B>,
    number_guard: G,
}

impl<S, B, G> BillingService<S, B, G> {
    pub fn new(dispatcher: CommandDispatcher<S, B>, number_guard: G) -> Self {
        Self {
            dispatcher,
            number_guard,
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }
}

impl<S, B, G> BillingService<S, B, G>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    G: InvoiceNumberGuard,
{
    /// Next candidate number for a billing period, derived from every
    /// number claimed so far.
    pub fn generate_next_number(&self, structure: Structure, month: u32, year: i32) -> String {
        next_invoice_number(&self.number_guard.claimed(), structure, month, year)
    }

    /// Create an invoice from an already-computed line item set.
    ///
    /// Claims a unique number, then dispatches the creation. If the
    /// dispatch fails after the claim, the claim is rolled back; if the
    /// claim collides, a fresh number is generated and the claim retried.
    #[allow(clippy::too_many_arguments)]
    pub fn create_invoice(
        &self,
        structure: Structure,
        invoice_id: InvoiceId,
        client: impl Into<String>,
        description: impl Into<String>,
        computation: InvoiceComputation,
        month: u32,
        year: i32,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        let client = client.into();
        let description = description.into();

        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let number = self.generate_next_number(structure, month, year);

            match self.number_guard.claim(&number) {
                Ok(()) => {}
                Err(ConstraintViolation::DuplicateInvoiceNumber(_)) => {
                    // Lost the race for this number; rescan and retry.
                    warn!(attempt, %number, "invoice number collision, regenerating");
                    continue;
                }
                Err(other) => return Err(other.into()),
            }

            let result = self.dispatcher.dispatch::<Invoice>(
                structure,
                invoice_id.into(),
                AGGREGATE_INVOICE,
                InvoiceCommand::CreateInvoice(CreateInvoice {
                    structure,
                    invoice_id,
                    number: number.clone(),
                    client: client.clone(),
                    description: description.clone(),
                    line_items: computation.line_items.clone(),
                    net_total: computation.net_total,
                    occurred_at,
                }),
                |_| Invoice::empty(invoice_id),
            );

            return match result {
                Ok(committed) => {
                    info!(%invoice_id, %number, "invoice created");
                    Ok(committed)
                }
                Err(e) => {
                    // The claim never became an invoice; free the number.
                    self.number_guard.release(&number);
                    Err(e.into())
                }
            };
        }

        Err(ServiceError::NumberingExhausted {
            attempts: MAX_NUMBER_ATTEMPTS,
        })
    }

    /// Whole-document replace of a pending invoice's contents. The number
    /// stays as assigned at creation.
    pub fn replace_contents(
        &self,
        structure: Structure,
        cmd: ReplaceInvoiceContents,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        let invoice_id = cmd.invoice_id;
        Ok(self.dispatcher.dispatch::<Invoice>(
            structure,
            invoice_id.into(),
            AGGREGATE_INVOICE,
            InvoiceCommand::ReplaceInvoiceContents(cmd),
            |_| Invoice::empty(invoice_id),
        )?)
    }

    pub fn mark_settled(
        &self,
        structure: Structure,
        cmd: MarkSettled,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        let invoice_id = cmd.invoice_id;
        Ok(self.dispatcher.dispatch::<Invoice>(
            structure,
            invoice_id.into(),
            AGGREGATE_INVOICE,
            InvoiceCommand::MarkSettled(cmd),
            |_| Invoice::empty(invoice_id),
        )?)
    }

    /// Cancel a pending invoice. The number stays burned: sequence scans
    /// still see it, so cancellations never cause reuse.
    pub fn cancel_invoice(
        &self,
        structure: Structure,
        cmd: CancelInvoice,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        let invoice_id = cmd.invoice_id;
        Ok(self.dispatcher.dispatch::<Invoice>(
            structure,
            invoice_id.into(),
            AGGREGATE_INVOICE,
            InvoiceCommand::CancelInvoice(cmd),
            |_| Invoice::empty(invoice_id),
        )?)
    }

    /// Append an expense entry to the ledger.
    pub fn record_expense(&self, cmd: RecordExpense) -> Result<Vec<StoredEvent>, ServiceError> {
        let expense_id = cmd.expense_id;
        Ok(self.dispatcher.dispatch::<Expense>(
            cmd.structure,
            expense_id.into(),
            AGGREGATE_EXPENSE,
            ExpenseCommand::RecordExpense(cmd),
            |_| Expense::empty(expense_id),
        )?)
    }
}
