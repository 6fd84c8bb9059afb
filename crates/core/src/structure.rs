//! Business-unit tag partitioning vehicles, drivers, units and invoices.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Structure: a business-unit tag, one of a small fixed set.
///
/// Every operation in the core takes the structure as an explicit parameter;
/// it is never inferred from ambient context. Event streams, guards and read
/// models are all scoped by structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Structure {
    /// Point-to-point mission line (tonnage-tariff billing).
    Gts,
    /// Daily allocation line (itemized-contract billing).
    Baticom,
}

impl Structure {
    pub const ALL: [Structure; 2] = [Structure::Gts, Structure::Baticom];

    /// Tag used in invoice numbers (`NN-MM/STRUCT/YYYY`).
    pub fn tag(&self) -> &'static str {
        match self {
            Structure::Gts => "GTS",
            Structure::Baticom => "BATICOM",
        }
    }
}

impl core::fmt::Display for Structure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Structure {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GTS" => Ok(Structure::Gts),
            "BATICOM" => Ok(Structure::Baticom),
            other => Err(DomainError::invalid_id(format!(
                "unknown structure tag: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_from_str() {
        for s in Structure::ALL {
            assert_eq!(s.tag().parse::<Structure>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "TRANSCO".parse::<Structure>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }
}
