//! Billing aggregation domain module (event-sourced).
//!
//! Turns closed operational data into tariffed invoices:
//!
//! - `tariff` — the two computation paths (tonnage tariff for GTS, itemized
//!   contract for BATICOM) and the 5% withholding derivation. Pure math;
//!   the derived HT/withholding/net triple is never hand-edited.
//! - `numbering` — the `NN-MM/STRUCT/YYYY` sequence scan. Uniqueness of the
//!   final number is enforced by the infrastructure guard, not here.
//! - `invoice` — the invoice aggregate: a snapshot created once per billing
//!   cycle per client, editable only as a whole-document replace.

pub mod invoice;
pub mod numbering;
pub mod tariff;

pub use invoice::{
    CancelInvoice, CreateInvoice, Invoice, InvoiceCancelled, InvoiceCommand, InvoiceContentsReplaced,
    InvoiceCreated, InvoiceEvent, InvoiceSettled, InvoiceStatus, MarkSettled,
    ReplaceInvoiceContents,
};
pub use numbering::{format_invoice_number, next_invoice_number};
pub use tariff::{
    ContractRow, ContractRowKind, InvoiceComputation, LineItem, TariffSchedule, TonnageTariffRow,
    compute_contract_invoice, compute_tonnage_invoice, tonnage_tariff, withholding_5pct,
};
