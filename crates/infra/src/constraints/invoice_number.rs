use std::collections::HashSet;
use std::sync::Mutex;

use super::ConstraintViolation;

/// Unique-index guard over formatted invoice numbers.
///
/// The numbering scan in the billing crate is not atomic: two concurrent
/// creations in the same month can compute the same "next" number. The
/// claim here is the authoritative uniqueness check; the losing caller
/// gets a retryable conflict and regenerates.
pub trait InvoiceNumberGuard: Send + Sync {
    /// Claim a formatted number. Atomic: of two concurrent claims for the
    /// same number, exactly one succeeds.
    fn claim(&self, number: &str) -> Result<(), ConstraintViolation>;

    /// Release a claimed number (rollback when invoice creation fails
    /// downstream of the claim). Cancelled invoices keep their number
    /// burned; this is only for claims that never became an invoice.
    fn release(&self, number: &str);

    /// All claimed numbers, for the sequence scan.
    fn claimed(&self) -> Vec<String>;
}

impl<G> InvoiceNumberGuard for std::sync::Arc<G>
where
    G: InvoiceNumberGuard + ?Sized,
{
    fn claim(&self, number: &str) -> Result<(), ConstraintViolation> {
        (**self).claim(number)
    }

    fn release(&self, number: &str) {
        (**self).release(number)
    }

    fn claimed(&self) -> Vec<String> {
        (**self).claimed()
    }
}

/// In-memory guard backed by a mutex (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryInvoiceNumberGuard {
    numbers: Mutex<HashSet<String>>,
}

impl InMemoryInvoiceNumberGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with numbers issued before this process started.
    pub fn with_existing(existing: impl IntoIterator<Item = String>) -> Self {
        Self {
            numbers: Mutex::new(existing.into_iter().collect()),
        }
    }
}

impl InvoiceNumberGuard for InMemoryInvoiceNumberGuard {
    fn claim(&self, number: &str) -> Result<(), ConstraintViolation> {
        let mut numbers = self
            .numbers
            .lock()
            .map_err(|_| ConstraintViolation::Unavailable)?;
        if !numbers.insert(number.to_string()) {
            return Err(ConstraintViolation::DuplicateInvoiceNumber(
                number.to_string(),
            ));
        }
        Ok(())
    }

    fn release(&self, number: &str) {
        if let Ok(mut numbers) = self.numbers.lock() {
            numbers.remove(number);
        }
    }

    fn claimed(&self) -> Vec<String> {
        self.numbers
            .lock()
            .map(|numbers| numbers.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_claim_conflicts() {
        let guard = InMemoryInvoiceNumberGuard::new();
        guard.claim("01-05/GTS/2025").unwrap();
        let err = guard.claim("01-05/GTS/2025").unwrap_err();
        assert_eq!(
            err,
            ConstraintViolation::DuplicateInvoiceNumber("01-05/GTS/2025".to_string())
        );
    }

    #[test]
    fn released_number_can_be_reclaimed() {
        let guard = InMemoryInvoiceNumberGuard::new();
        guard.claim("01-05/GTS/2025").unwrap();
        guard.release("01-05/GTS/2025");
        assert!(guard.claim("01-05/GTS/2025").is_ok());
    }

    #[test]
    fn seeded_numbers_are_already_claimed() {
        let guard =
            InMemoryInvoiceNumberGuard::with_existing(vec!["02-05/GTS/2025".to_string()]);
        assert!(guard.claim("02-05/GTS/2025").is_err());
        assert_eq!(guard.claimed(), vec!["02-05/GTS/2025".to_string()]);
    }
}
