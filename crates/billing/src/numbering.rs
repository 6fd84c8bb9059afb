//! Invoice number sequencing.
//!
//! Numbers follow `NN-MM/STRUCT/YYYY`: a per-structure, per-month, per-year
//! sequence. This module only derives the next candidate from the numbers
//! already issued; the uniqueness claim happens in the infrastructure layer,
//! which retries here on collision.

use fleetops_core::Structure;

/// Format an invoice number from its parts, e.g. `03-05/GTS/2025`.
pub fn format_invoice_number(sequence: u32, month: u32, year: i32, structure: Structure) -> String {
    format!("{sequence:02}-{month:02}/{tag}/{year:04}", tag = structure.tag())
}

/// Scan already-issued numbers and produce the next one for the given
/// structure, month and year.
///
/// Numbers that do not match the expected suffix, or whose sequence part
/// does not parse, are skipped rather than treated as errors; the scan is
/// resilient to manually entered legacy numbers.
pub fn next_invoice_number(
    existing: &[String],
    structure: Structure,
    month: u32,
    year: i32,
) -> String {
    let suffix = format!("-{month:02}/{tag}/{year:04}", tag = structure.tag());
    let max_seq = existing
        .iter()
        .filter_map(|number| number.strip_suffix(&suffix))
        .filter_map(|prefix| {
            // Sequence part is 1 or 2 digits; anything else is a foreign
            // number that happens to share the suffix.
            if prefix.is_empty() || prefix.len() > 2 || !prefix.bytes().all(|b| b.is_ascii_digit())
            {
                return None;
            }
            prefix.parse::<u32>().ok()
        })
        .max()
        .unwrap_or(0);

    format_invoice_number(max_seq + 1, month, year, structure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(
            format_invoice_number(3, 5, 2025, Structure::Gts),
            "03-05/GTS/2025"
        );
        assert_eq!(
            format_invoice_number(12, 11, 2025, Structure::Baticom),
            "12-11/BATICOM/2025"
        );
    }

    #[test]
    fn next_number_continues_the_month_sequence() {
        let existing = vec![
            "01-05/GTS/2025".to_string(),
            "02-05/GTS/2025".to_string(),
        ];
        assert_eq!(
            next_invoice_number(&existing, Structure::Gts, 5, 2025),
            "03-05/GTS/2025"
        );
    }

    #[test]
    fn sequences_are_independent_per_scope() {
        let existing = vec![
            "04-05/GTS/2025".to_string(),
            "09-04/GTS/2025".to_string(),    // other month
            "07-05/BATICOM/2025".to_string(), // other structure
            "11-05/GTS/2024".to_string(),    // other year
        ];
        assert_eq!(
            next_invoice_number(&existing, Structure::Gts, 5, 2025),
            "05-05/GTS/2025"
        );
        assert_eq!(
            next_invoice_number(&existing, Structure::Baticom, 5, 2025),
            "08-05/BATICOM/2025"
        );
    }

    #[test]
    fn empty_history_starts_at_one() {
        assert_eq!(
            next_invoice_number(&[], Structure::Baticom, 1, 2026),
            "01-01/BATICOM/2026"
        );
    }

    #[test]
    fn malformed_numbers_are_skipped() {
        let existing = vec![
            "junk".to_string(),
            "XX-05/GTS/2025".to_string(),
            "123-05/GTS/2025".to_string(), // sequence too wide
            "02-05/GTS/2025".to_string(),
        ];
        assert_eq!(
            next_invoice_number(&existing, Structure::Gts, 5, 2025),
            "03-05/GTS/2025"
        );
    }

    #[test]
    fn gaps_do_not_get_backfilled() {
        // Scan is max+1, not lowest-free; cancelled numbers stay burned.
        let existing = vec!["01-05/GTS/2025".to_string(), "05-05/GTS/2025".to_string()];
        assert_eq!(
            next_invoice_number(&existing, Structure::Gts, 5, 2025),
            "06-05/GTS/2025"
        );
    }
}
