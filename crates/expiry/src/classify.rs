use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Urgency tier for a document expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryTier {
    Expired,
    Critical,
    Warning,
    Ok,
}

/// Classification result: tier plus the signed day count it derives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryStatus {
    pub tier: ExpiryTier,
    pub days_remaining: i64,
}

/// Classify an expiry date relative to `today`.
///
/// Thresholds:
/// - `days_remaining < 0`  → Expired
/// - `0..=15`              → Critical
/// - `16..=30`             → Warning
/// - otherwise             → Ok
pub fn classify(expiry: NaiveDate, today: NaiveDate) -> ExpiryStatus {
    let days_remaining = (expiry - today).num_days();
    let tier = if days_remaining < 0 {
        ExpiryTier::Expired
    } else if days_remaining <= 15 {
        ExpiryTier::Critical
    } else if days_remaining <= 30 {
        ExpiryTier::Warning
    } else {
        ExpiryTier::Ok
    };
    ExpiryStatus {
        tier,
        days_remaining,
    }
}

/// Sort classified entries for display: Expired first, then by soonest
/// `days_remaining` ascending. Stable, so ties keep their input order.
pub fn sort_by_urgency<T>(entries: &mut [(T, ExpiryStatus)]) {
    entries.sort_by_key(|(_, status)| {
        (
            status.tier != ExpiryTier::Expired,
            status.days_remaining,
        )
    });
}

/// Aggregate urgency flag: raised by Expired entries only.
///
/// Critical/Warning entries do not raise it; the list is "urgent" exactly
/// when something has already lapsed.
pub fn any_expired(statuses: &[ExpiryStatus]) -> bool {
    statuses.iter().any(|s| s.tier == ExpiryTier::Expired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> (NaiveDate, NaiveDate) {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        (today + chrono::Duration::days(offset), today)
    }

    #[test]
    fn boundary_classification() {
        let cases = [
            (-1, ExpiryTier::Expired),
            (0, ExpiryTier::Critical),
            (15, ExpiryTier::Critical),
            (16, ExpiryTier::Warning),
            (30, ExpiryTier::Warning),
            (31, ExpiryTier::Ok),
        ];
        for (offset, expected) in cases {
            let (expiry, today) = day(offset);
            let status = classify(expiry, today);
            assert_eq!(status.tier, expected, "offset {offset}");
            assert_eq!(status.days_remaining, offset);
        }
    }

    #[test]
    fn sort_puts_expired_first_then_soonest() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let mk = |offset: i64| classify(today + chrono::Duration::days(offset), today);

        let mut entries = vec![
            ("insurance", mk(20)),
            ("permit", mk(-3)),
            ("inspection", mk(2)),
            ("license", mk(-1)),
        ];
        sort_by_urgency(&mut entries);

        let labels: Vec<&str> = entries.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["permit", "license", "inspection", "insurance"]);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let status = classify(today + chrono::Duration::days(5), today);
        let mut entries = vec![("a", status), ("b", status), ("c", status)];
        sort_by_urgency(&mut entries);
        let labels: Vec<&str> = entries.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn urgency_flag_ignores_critical_and_warning() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let mk = |offset: i64| classify(today + chrono::Duration::days(offset), today);

        // Critical + Warning only: not urgent.
        assert!(!any_expired(&[mk(0), mk(15), mk(20)]));
        // One expired entry flips the flag.
        assert!(any_expired(&[mk(40), mk(-1)]));
        // Empty list: not urgent.
        assert!(!any_expired(&[]));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: classification tier follows days_remaining exactly,
            /// for any offset.
            #[test]
            fn tier_matches_day_ranges(offset in -2000i64..2000) {
                let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
                let status = classify(today + chrono::Duration::days(offset), today);
                prop_assert_eq!(status.days_remaining, offset);
                let expected = match offset {
                    o if o < 0 => ExpiryTier::Expired,
                    o if o <= 15 => ExpiryTier::Critical,
                    o if o <= 30 => ExpiryTier::Warning,
                    _ => ExpiryTier::Ok,
                };
                prop_assert_eq!(status.tier, expected);
            }
        }
    }
}
