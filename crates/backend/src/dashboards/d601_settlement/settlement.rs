use std::collections::BTreeMap;

use super::windows::Dimension;
use crate::shared::catalog::Windowed;

/// Итоговая строка по одной группе (дилер или уровень)
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRow {
    /// Entity id or tier label
    pub group: String,
    pub display_name: Option<String>,
    pub tier: Option<String>,
    /// Distinct entities per window; tier grouping only
    pub entity_count: Option<Windowed<f64>>,
    /// Distinct dates per window
    pub effective_days: Windowed<f64>,
    /// Base metrics and composites
    pub metrics: BTreeMap<String, Windowed<f64>>,
    pub derived: BTreeMap<String, Windowed<f64>>,
}

impl SettlementRow {
    pub fn metric(&self, name: &str) -> Option<&Windowed<f64>> {
        self.metrics.get(name)
    }

    pub fn derived(&self, name: &str) -> Option<&Windowed<f64>> {
        self.derived.get(name)
    }
}

/// Output of the aggregator: sums only
#[derive(Debug, Clone)]
pub struct AggregatedSettlement {
    pub dimension: Dimension,
    pub rows: Vec<SettlementRow>,
}

impl AggregatedSettlement {
    pub fn row(&self, group: &str) -> Option<&SettlementRow> {
        self.rows.iter().find(|r| r.group == group)
    }
}

/// Sums plus derived metrics, computed from pre-normalization sums.
/// Only the tier normalizer consumes it.
#[derive(Debug, Clone)]
pub struct DerivedSettlement {
    pub(super) dimension: Dimension,
    pub(super) rows: Vec<SettlementRow>,
}

impl DerivedSettlement {
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn rows(&self) -> &[SettlementRow] {
        &self.rows
    }
}

/// Read-only result handed to the finalizer
#[derive(Debug, Clone)]
pub struct FinalSettlement {
    pub(super) dimension: Dimension,
    pub(super) rows: Vec<SettlementRow>,
    pub(super) tier_normalized: bool,
}

impl FinalSettlement {
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn rows(&self) -> &[SettlementRow] {
        &self.rows
    }

    pub fn row(&self, group: &str) -> Option<&SettlementRow> {
        self.rows.iter().find(|r| r.group == group)
    }

    /// Whether absolute metrics were divided by the entity count
    pub fn tier_normalized(&self) -> bool {
        self.tier_normalized
    }
}
