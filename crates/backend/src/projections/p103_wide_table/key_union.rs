use std::collections::BTreeSet;

use crate::projections::p101_daily_metrics::{CanonicalTable, DailyKey};

/// Master key set: every (entity_id, date) seen by any transactional source
pub fn union_keys(tables: &[CanonicalTable]) -> BTreeSet<DailyKey> {
    tables
        .iter()
        .filter(|t| !t.kind.is_dimension())
        .flat_map(|t| t.keys().cloned())
        .collect()
}
