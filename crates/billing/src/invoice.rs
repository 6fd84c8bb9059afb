use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetops_core::{Aggregate, AggregateRoot, DomainError, InvoiceId, Structure};
use fleetops_events::Event;

use crate::tariff::LineItem;

/// Invoice lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Settled,
    Cancelled,
}

/// Aggregate root: Invoice.
///
/// A snapshot of one billing cycle for one client. Created once with its
/// fully-computed line items and net total; afterwards the only edit is a
/// whole-document replace while still pending. The number is assigned at
/// creation and never changes, even across replaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    id: InvoiceId,
    structure: Option<Structure>,
    number: String,
    client: String,
    description: String,
    line_items: Vec<LineItem>,
    net_total: i64,
    status: InvoiceStatus,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            structure: None,
            number: String::new(),
            client: String::new(),
            description: String::new(),
            line_items: Vec::new(),
            net_total: 0,
            status: InvoiceStatus::Pending,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn structure(&self) -> Option<Structure> {
        self.structure
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn net_total(&self) -> i64 {
        self.net_total
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), DomainError> {
        self.ensure_created()?;
        match self.status {
            InvoiceStatus::Pending => Ok(()),
            InvoiceStatus::Settled => Err(DomainError::conflict("invoice is already settled")),
            InvoiceStatus::Cancelled => Err(DomainError::conflict("invoice is cancelled")),
        }
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
///
/// Carries the already-computed line items and net total; the number comes
/// from the numbering scan plus the uniqueness claim upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub structure: Structure,
    pub invoice_id: InvoiceId,
    pub number: String,
    pub client: String,
    pub description: String,
    pub line_items: Vec<LineItem>,
    pub net_total: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplaceInvoiceContents. Whole-document replace of the editable
/// fields; number, structure and id stay fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceInvoiceContents {
    pub invoice_id: InvoiceId,
    pub client: String,
    pub description: String,
    pub line_items: Vec<LineItem>,
    pub net_total: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSettled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSettled {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInvoice {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    ReplaceInvoiceContents(ReplaceInvoiceContents),
    MarkSettled(MarkSettled),
    CancelInvoice(CancelInvoice),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub structure: Structure,
    pub invoice_id: InvoiceId,
    pub number: String,
    pub client: String,
    pub description: String,
    pub line_items: Vec<LineItem>,
    pub net_total: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceContentsReplaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceContentsReplaced {
    pub invoice_id: InvoiceId,
    pub client: String,
    pub description: String,
    pub line_items: Vec<LineItem>,
    pub net_total: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceSettled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSettled {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoiceContentsReplaced(InvoiceContentsReplaced),
    InvoiceSettled(InvoiceSettled),
    InvoiceCancelled(InvoiceCancelled),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "billing.invoice.created",
            InvoiceEvent::InvoiceContentsReplaced(_) => "billing.invoice.contents_replaced",
            InvoiceEvent::InvoiceSettled(_) => "billing.invoice.settled",
            InvoiceEvent::InvoiceCancelled(_) => "billing.invoice.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoiceContentsReplaced(e) => e.occurred_at,
            InvoiceEvent::InvoiceSettled(e) => e.occurred_at,
            InvoiceEvent::InvoiceCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.structure = Some(e.structure);
                self.number = e.number.clone();
                self.client = e.client.clone();
                self.description = e.description.clone();
                self.line_items = e.line_items.clone();
                self.net_total = e.net_total;
                self.status = InvoiceStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            InvoiceEvent::InvoiceContentsReplaced(e) => {
                self.client = e.client.clone();
                self.description = e.description.clone();
                self.line_items = e.line_items.clone();
                self.net_total = e.net_total;
            }
            InvoiceEvent::InvoiceSettled(_) => {
                self.status = InvoiceStatus::Settled;
            }
            InvoiceEvent::InvoiceCancelled(_) => {
                self.status = InvoiceStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::ReplaceInvoiceContents(cmd) => self.handle_replace(cmd),
            InvoiceCommand::MarkSettled(cmd) => self.handle_settle(cmd),
            InvoiceCommand::CancelInvoice(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Invoice {
    fn validate_contents(client: &str, net_total: i64) -> Result<(), DomainError> {
        if client.trim().is_empty() {
            return Err(DomainError::validation("invoice must have a client"));
        }
        if net_total < 0 {
            return Err(DomainError::validation("invoice net total cannot be negative"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("invoice must carry a number"));
        }
        Self::validate_contents(&cmd.client, cmd.net_total)?;
        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            structure: cmd.structure,
            invoice_id: cmd.invoice_id,
            number: cmd.number.clone(),
            client: cmd.client.clone(),
            description: cmd.description.clone(),
            line_items: cmd.line_items.clone(),
            net_total: cmd.net_total,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace(
        &self,
        cmd: &ReplaceInvoiceContents,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_pending()?;
        Self::validate_contents(&cmd.client, cmd.net_total)?;
        Ok(vec![InvoiceEvent::InvoiceContentsReplaced(
            InvoiceContentsReplaced {
                invoice_id: cmd.invoice_id,
                client: cmd.client.clone(),
                description: cmd.description.clone(),
                line_items: cmd.line_items.clone(),
                net_total: cmd.net_total,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_settle(&self, cmd: &MarkSettled) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        match self.status {
            // Settling twice is a no-op.
            InvoiceStatus::Settled => Ok(vec![]),
            InvoiceStatus::Cancelled => Err(DomainError::conflict("invoice is cancelled")),
            InvoiceStatus::Pending => Ok(vec![InvoiceEvent::InvoiceSettled(InvoiceSettled {
                invoice_id: cmd.invoice_id,
                occurred_at: cmd.occurred_at,
            })]),
        }
    }

    fn handle_cancel(&self, cmd: &CancelInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        match self.status {
            InvoiceStatus::Cancelled => Ok(vec![]),
            InvoiceStatus::Settled => Err(DomainError::conflict(
                "a settled invoice cannot be cancelled",
            )),
            InvoiceStatus::Pending => Ok(vec![InvoiceEvent::InvoiceCancelled(InvoiceCancelled {
                invoice_id: cmd.invoice_id,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            })]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetops_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn sample_items() -> (Vec<LineItem>, i64) {
        let items = vec![
            LineItem {
                label: "Mission 01".to_string(),
                amount: 313_500,
            },
            LineItem {
                label: "Tariff total".to_string(),
                amount: 330_000,
            },
            LineItem {
                label: "Withholding 5%".to_string(),
                amount: 16_500,
            },
        ];
        (items, 313_500)
    }

    fn created_invoice() -> Invoice {
        let id = InvoiceId::new();
        let mut invoice = Invoice::empty(id);
        let (line_items, net_total) = sample_items();
        execute(
            &mut invoice,
            &InvoiceCommand::CreateInvoice(CreateInvoice {
                structure: Structure::Gts,
                invoice_id: id,
                number: "01-05/GTS/2025".to_string(),
                client: "SOTRANS".to_string(),
                description: "May 2025 haulage".to_string(),
                line_items,
                net_total,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        invoice
    }

    #[test]
    fn create_pins_number_and_contents() {
        let invoice = created_invoice();
        assert_eq!(invoice.number(), "01-05/GTS/2025");
        assert_eq!(invoice.net_total(), 313_500);
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.line_items().len(), 3);
    }

    #[test]
    fn create_requires_client_and_non_negative_net() {
        let id = InvoiceId::new();
        let invoice = Invoice::empty(id);
        let base = CreateInvoice {
            structure: Structure::Gts,
            invoice_id: id,
            number: "01-05/GTS/2025".to_string(),
            client: "SOTRANS".to_string(),
            description: String::new(),
            line_items: vec![],
            net_total: 0,
            occurred_at: test_time(),
        };

        let mut no_client = base.clone();
        no_client.client = "  ".to_string();
        let err = invoice
            .handle(&InvoiceCommand::CreateInvoice(no_client))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut negative = base;
        negative.net_total = -1;
        let err = invoice
            .handle(&InvoiceCommand::CreateInvoice(negative))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn replace_swaps_contents_but_keeps_number() {
        let mut invoice = created_invoice();
        let invoice_id = invoice.id_typed();
        execute(
            &mut invoice,
            &InvoiceCommand::ReplaceInvoiceContents(ReplaceInvoiceContents {
                invoice_id,
                client: "SOTRANS".to_string(),
                description: "May 2025 haulage, corrected".to_string(),
                line_items: vec![LineItem {
                    label: "Total HT".to_string(),
                    amount: 430_000,
                }],
                net_total: 408_500,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(invoice.number(), "01-05/GTS/2025");
        assert_eq!(invoice.net_total(), 408_500);
        assert_eq!(invoice.line_items().len(), 1);
    }

    #[test]
    fn settled_invoice_is_frozen() {
        let mut invoice = created_invoice();
        let invoice_id = invoice.id_typed();
        execute(
            &mut invoice,
            &InvoiceCommand::MarkSettled(MarkSettled {
                invoice_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Settled);

        let err = invoice
            .handle(&InvoiceCommand::ReplaceInvoiceContents(
                ReplaceInvoiceContents {
                    invoice_id: invoice.id_typed(),
                    client: "SOTRANS".to_string(),
                    description: String::new(),
                    line_items: vec![],
                    net_total: 0,
                    occurred_at: test_time(),
                },
            ))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err = invoice
            .handle(&InvoiceCommand::CancelInvoice(CancelInvoice {
                invoice_id: invoice.id_typed(),
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn settle_is_idempotent() {
        let mut invoice = created_invoice();
        let cmd = InvoiceCommand::MarkSettled(MarkSettled {
            invoice_id: invoice.id_typed(),
            occurred_at: test_time(),
        });
        execute(&mut invoice, &cmd).unwrap();
        let again = invoice.handle(&cmd).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn cancel_requires_pending() {
        let mut invoice = created_invoice();
        let invoice_id = invoice.id_typed();
        execute(
            &mut invoice,
            &InvoiceCommand::CancelInvoice(CancelInvoice {
                invoice_id,
                reason: Some("duplicate entry".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Cancelled);

        let err = invoice
            .handle(&InvoiceCommand::MarkSettled(MarkSettled {
                invoice_id: invoice.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn commands_on_missing_invoice_are_not_found() {
        let id = InvoiceId::new();
        let invoice = Invoice::empty(id);
        let err = invoice
            .handle(&InvoiceCommand::MarkSettled(MarkSettled {
                invoice_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }
}
