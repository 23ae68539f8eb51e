use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::settlement::{AggregatedSettlement, SettlementRow};
use super::windows::{Dimension, ReportWindows};
use crate::projections::p103_wide_table::{WideRow, WideTable};
use crate::shared::catalog::{Composite, MetricCatalog, Window, Windowed};

/// Новая широкая таблица с добавленными составными метриками.
/// Composites may reference earlier composites; unknown terms count as 0.
pub fn with_composites(wide: &WideTable, composites: &[Composite]) -> WideTable {
    let mut metric_names = wide.metric_names.clone();
    let mut plans: Vec<Vec<(Option<usize>, f64)>> = Vec::with_capacity(composites.len());
    for composite in composites {
        let terms = composite
            .terms
            .iter()
            .map(|(name, weight)| (metric_names.iter().position(|m| m == name), *weight))
            .collect();
        plans.push(terms);
        metric_names.push(composite.name.clone());
    }

    let rows = wide
        .rows
        .iter()
        .map(|row| {
            let mut values = row.values.clone();
            for terms in &plans {
                let value: f64 = terms
                    .iter()
                    .map(|(idx, weight)| idx.and_then(|i| values.get(i)).copied().unwrap_or(0.0) * weight)
                    .sum();
                values.push(value);
            }
            WideRow {
                values,
                ..row.clone()
            }
        })
        .collect();

    WideTable { metric_names, rows }
}

#[derive(Default)]
struct GroupAccumulator {
    sums: Vec<Windowed<f64>>,
    dates: Windowed<BTreeSet<NaiveDate>>,
    entities: Windowed<BTreeSet<String>>,
    display_name: Option<String>,
    tier: Option<String>,
}

impl GroupAccumulator {
    fn add(&mut self, row: &WideRow, windows: &ReportWindows) {
        if self.sums.len() < row.values.len() {
            self.sums.resize(row.values.len(), Windowed::default());
        }
        if self.display_name.is_none() {
            self.display_name = row.display_name.clone();
        }
        if self.tier.is_none() {
            self.tier = row.tier.clone();
        }

        for window in Window::ALL {
            if !windows.contains(window, row.date) {
                continue;
            }
            for (sum, value) in self.sums.iter_mut().zip(&row.values) {
                *sum.get_mut(window) += value;
            }
            self.dates.get_mut(window).insert(row.date);
            self.entities.get_mut(window).insert(row.entity_id.clone());
        }
    }
}

fn counts<T>(sets: &Windowed<BTreeSet<T>>) -> Windowed<f64> {
    Windowed::new(
        sets.total.len() as f64,
        sets.current.len() as f64,
        sets.prior.len() as f64,
    )
}

/// Уровни по убыванию, неизвестный уровень последним
fn tier_order(unknown: &str) -> impl Fn(&SettlementRow, &SettlementRow) -> Ordering + '_ {
    move |a, b| match (a.group == unknown, b.group == unknown) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => b.group.cmp(&a.group),
    }
}

/// Group the wide table by entity or tier and sum every metric over the
/// total range and each window. Composites are materialized first.
///
/// Rows without a tier are grouped under `unknown_tier_label`.
pub fn settle(
    wide: &WideTable,
    dimension: Dimension,
    windows: &ReportWindows,
    catalog: &MetricCatalog,
    unknown_tier_label: &str,
) -> AggregatedSettlement {
    let table = with_composites(wide, &catalog.composites);

    let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    for row in &table.rows {
        let key = match dimension {
            Dimension::Entity => row.entity_id.clone(),
            Dimension::Tier => row
                .tier
                .clone()
                .unwrap_or_else(|| unknown_tier_label.to_string()),
        };
        groups.entry(key).or_default().add(row, windows);
    }

    let mut rows: Vec<SettlementRow> = groups
        .into_iter()
        .map(|(group, acc)| {
            let mut metrics = BTreeMap::new();
            for (idx, name) in table.metric_names.iter().enumerate() {
                let sum = acc.sums.get(idx).copied().unwrap_or_default();
                metrics.insert(name.clone(), sum);
            }
            let (display_name, tier, entity_count) = match dimension {
                Dimension::Entity => (acc.display_name, acc.tier, None),
                Dimension::Tier => (None, Some(group.clone()), Some(counts(&acc.entities))),
            };
            SettlementRow {
                group,
                display_name,
                tier,
                entity_count,
                effective_days: counts(&acc.dates),
                metrics,
                derived: BTreeMap::new(),
            }
        })
        .collect();

    if dimension == Dimension::Tier {
        rows.sort_by(tier_order(unknown_tier_label));
    }

    tracing::info!(
        "settlement by {}: {} wide rows -> {} groups",
        dimension.as_str(),
        table.len(),
        rows.len()
    );

    AggregatedSettlement { dimension, rows }
}
