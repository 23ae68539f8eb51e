use super::derived::safe_div;
use super::settlement::{DerivedSettlement, FinalSettlement};
use super::windows::Dimension;
use crate::shared::catalog::{MetricCatalog, Window};

/// Делит абсолютные метрики уровня на число магазинов в уровне.
///
/// Consumes the derived settlement, so it runs at most once per run. Only
/// names from `catalog.tier_normalized` that are aggregated sums are touched;
/// derived ratios keep their pre-normalization values. The divisor is the
/// tier's total-range entity count for every window.
pub fn normalize_tiers(
    settlement: DerivedSettlement,
    catalog: &MetricCatalog,
    enabled: bool,
) -> FinalSettlement {
    let DerivedSettlement { dimension, mut rows } = settlement;

    if dimension != Dimension::Tier || !enabled {
        return FinalSettlement {
            dimension,
            rows,
            tier_normalized: false,
        };
    }

    for row in &mut rows {
        let count = row.entity_count.map_or(0.0, |c| c.total);
        for name in &catalog.tier_normalized {
            if catalog.is_derived(name) {
                continue;
            }
            if let Some(values) = row.metrics.get_mut(name) {
                for window in Window::ALL {
                    let value = values.get_mut(window);
                    *value = safe_div(*value, count);
                }
            }
        }
    }
    tracing::info!("tier normalization applied to {} tiers", rows.len());

    FinalSettlement {
        dimension,
        rows,
        tier_normalized: true,
    }
}
