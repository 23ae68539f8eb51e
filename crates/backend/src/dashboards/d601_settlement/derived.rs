use std::collections::BTreeMap;

use super::settlement::{AggregatedSettlement, DerivedSettlement, SettlementRow};
use crate::shared::catalog::{MetricCatalog, Operand, Window, Windowed};

/// Деление с защитой: нулевой или нечисловой знаменатель даёт 0
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return 0.0;
    }
    let result = numerator / denominator;
    if result.is_finite() {
        result
    } else {
        0.0
    }
}

fn operand_value(
    row: &SettlementRow,
    computed: &BTreeMap<String, Windowed<f64>>,
    operand: &Operand,
    window: Window,
) -> f64 {
    match operand {
        Operand::Metric(name) => row.metrics.get(name).map_or(0.0, |w| *w.get(window)),
        Operand::EffectiveDays => *row.effective_days.get(window),
        Operand::Derived(name) => computed.get(name).map_or(0.0, |w| *w.get(window)),
    }
}

/// Производные метрики по агрегированным суммам, одинаково для всех окон
pub fn compute_derived(aggregated: AggregatedSettlement, catalog: &MetricCatalog) -> DerivedSettlement {
    let AggregatedSettlement { dimension, rows } = aggregated;

    let rows = rows
        .into_iter()
        .map(|mut row| {
            let mut computed: BTreeMap<String, Windowed<f64>> = BTreeMap::new();
            for def in &catalog.derived {
                let mut values = Windowed::default();
                for window in Window::ALL {
                    let numerator = operand_value(&row, &computed, &def.numerator, window);
                    let denominator = operand_value(&row, &computed, &def.denominator, window);
                    *values.get_mut(window) = safe_div(numerator, denominator);
                }
                computed.insert(def.name.clone(), values);
            }
            row.derived = computed;
            row
        })
        .collect();

    DerivedSettlement { dimension, rows }
}
