use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::shared::catalog::SourceKind;

/// (entity_id, date)
pub type DailyKey = (String, NaiveDate);

/// Normalized source: one record per key, metric values in `metric_names` order.
#[derive(Debug, Clone)]
pub struct CanonicalTable {
    pub kind: SourceKind,
    pub metric_names: Vec<String>,
    pub records: BTreeMap<DailyKey, Vec<f64>>,
}

impl CanonicalTable {
    pub fn new(
        kind: SourceKind,
        metric_names: Vec<String>,
        records: BTreeMap<DailyKey, Vec<f64>>,
    ) -> Self {
        Self {
            kind,
            metric_names,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DailyKey> {
        self.records.keys()
    }

    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metric_names.iter().position(|m| m == metric)
    }

    pub fn value(&self, entity_id: &str, date: NaiveDate, metric: &str) -> Option<f64> {
        let idx = self.metric_index(metric)?;
        self.records
            .get(&(entity_id.to_string(), date))
            .and_then(|values| values.get(idx).copied())
    }

    /// Number of keys with a non-zero value, per metric
    pub fn non_zero_counts(&self) -> Vec<(String, usize)> {
        self.metric_names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let count = self
                    .records
                    .values()
                    .filter(|values| values.get(idx).map_or(false, |v| *v != 0.0))
                    .count();
                (name.clone(), count)
            })
            .collect()
    }
}
