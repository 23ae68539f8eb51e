use std::collections::{HashMap, HashSet};

use super::predicates::RowPredicate;
use super::source_kind::SourceKind;
use crate::shared::errors::PipelineError;

pub const EFFECTIVE_DAYS: &str = "effective_days";
pub const ENTITY_COUNT: &str = "entity_count";

/// Окно отчёта: весь период, текущий (T) и предыдущий (T-1) месяцы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Total,
    Current,
    Prior,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::Total, Window::Current, Window::Prior];

    pub fn suffix(&self) -> &'static str {
        match self {
            Window::Total => "total",
            Window::Current => "current",
            Window::Prior => "prior",
        }
    }
}

/// One value per report window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Windowed<T> {
    pub total: T,
    pub current: T,
    pub prior: T,
}

impl<T> Windowed<T> {
    pub fn new(total: T, current: T, prior: T) -> Self {
        Self {
            total,
            current,
            prior,
        }
    }

    pub fn get(&self, window: Window) -> &T {
        match window {
            Window::Total => &self.total,
            Window::Current => &self.current,
            Window::Prior => &self.prior,
        }
    }

    pub fn get_mut(&mut self, window: Window) -> &mut T {
        match window {
            Window::Total => &mut self.total,
            Window::Current => &mut self.current,
            Window::Prior => &mut self.prior,
        }
    }
}

/// Where a source row gets its date from
#[derive(Debug, Clone, PartialEq)]
pub enum DateSource {
    Column(String),
    /// Дата зашита в название листа
    SheetLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetMode {
    Single,
    /// Caller must list the sheets to concatenate
    Multi,
}

/// Source column renamed to a canonical name
#[derive(Debug, Clone)]
pub struct MetricColumn {
    pub column: String,
    pub name: String,
}

impl MetricColumn {
    pub fn new(column: &str, name: &str) -> Self {
        Self {
            column: column.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct PredicateMetric {
    pub metric: String,
    pub predicate: RowPredicate,
}

impl PredicateMetric {
    pub fn new(metric: &str, predicate: RowPredicate) -> Self {
        Self {
            metric: metric.to_string(),
            predicate,
        }
    }
}

impl std::fmt::Debug for PredicateMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateMetric")
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

/// Column map of one source kind
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub sheets: SheetMode,
    pub entity_column: String,
    pub date: DateSource,
    /// Numeric columns summed per key
    pub metrics: Vec<MetricColumn>,
    /// Text columns exposed to predicates
    pub attributes: Vec<MetricColumn>,
    /// Each predicate contributes 1.0 per matching row
    pub predicates: Vec<PredicateMetric>,
}

impl SourceSpec {
    pub fn metric_names(&self) -> Vec<String> {
        self.metrics
            .iter()
            .map(|m| m.name.clone())
            .chain(self.predicates.iter().map(|p| p.metric.clone()))
            .collect()
    }
}

/// Weighted sum of metrics, computed per wide-table row before windowing
#[derive(Debug, Clone)]
pub struct Composite {
    pub name: String,
    pub terms: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Metric(String),
    EffectiveDays,
    /// A derived metric defined earlier in the list
    Derived(String),
}

#[derive(Debug, Clone)]
pub struct DerivedDefinition {
    pub name: String,
    pub numerator: Operand,
    pub denominator: Operand,
}

/// Column signatures of the dealer workbook roles
#[derive(Debug, Clone)]
pub struct DimensionSpec {
    pub tier_entity_column: String,
    pub tier_column: String,
    pub store_entity_column: String,
    pub store_name_column: String,
}

/// Display names of key columns and window prefixes
#[derive(Debug, Clone)]
pub struct DisplayLabels {
    pub entity_id: String,
    pub display_name: String,
    pub tier: String,
    pub entity_count: String,
    pub effective_days: String,
    pub window_prefixes: Windowed<String>,
}

/// Immutable set of tables that drives every pipeline stage.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    pub sources: Vec<SourceSpec>,
    pub dimension: DimensionSpec,
    pub composites: Vec<Composite>,
    pub derived: Vec<DerivedDefinition>,
    /// Absolute metrics divided by the tier's entity count
    pub tier_normalized: Vec<String>,
    pub labels: DisplayLabels,
    /// Metric name -> base display name (without window prefix)
    pub display_names: HashMap<String, String>,
}

impl MetricCatalog {
    pub fn source(&self, kind: SourceKind) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.kind == kind)
    }

    /// Metrics produced by normalizers, in catalog order
    pub fn base_metrics(&self) -> Vec<String> {
        self.sources
            .iter()
            .flat_map(|s| s.metric_names())
            .collect()
    }

    /// Base metrics followed by composites: everything the aggregator sums
    pub fn aggregated_metrics(&self) -> Vec<String> {
        let mut names = self.base_metrics();
        names.extend(self.composites.iter().map(|c| c.name.clone()));
        names
    }

    pub fn is_derived(&self, name: &str) -> bool {
        self.derived.iter().any(|d| d.name == name)
    }

    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.display_names.get(name).map(String::as_str)
    }

    /// Consistency check of the tables, run once before the catalog is shared
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidCatalog(msg));

        let mut kinds = HashSet::new();
        for source in &self.sources {
            if !kinds.insert(source.kind) {
                return invalid(format!("source kind '{}' declared twice", source.kind));
            }
            if source.kind.is_dimension() {
                return invalid(format!(
                    "'{}' is the dimension workbook, it has no column map",
                    source.kind
                ));
            }
        }

        let mut known: HashSet<String> = HashSet::new();
        for name in self.base_metrics() {
            if name == EFFECTIVE_DAYS || name == ENTITY_COUNT {
                return invalid(format!("'{}' is a reserved name", name));
            }
            if !known.insert(name.clone()) {
                return invalid(format!("metric '{}' is produced by several sources", name));
            }
        }

        for composite in &self.composites {
            for (term, _) in &composite.terms {
                if !known.contains(term) {
                    return invalid(format!(
                        "composite '{}' references unknown metric '{}'",
                        composite.name, term
                    ));
                }
            }
            if !known.insert(composite.name.clone()) {
                return invalid(format!("composite '{}' shadows a metric", composite.name));
            }
        }

        let mut derived_seen: HashSet<&str> = HashSet::new();
        for def in &self.derived {
            for operand in [&def.numerator, &def.denominator] {
                match operand {
                    Operand::Metric(name) if !known.contains(name) => {
                        return invalid(format!(
                            "derived '{}' references unknown metric '{}'",
                            def.name, name
                        ))
                    }
                    Operand::Derived(name) if !derived_seen.contains(name.as_str()) => {
                        return invalid(format!(
                            "derived '{}' references '{}' before it is defined",
                            def.name, name
                        ))
                    }
                    _ => {}
                }
            }
            if known.contains(&def.name) || !derived_seen.insert(def.name.as_str()) {
                return invalid(format!("derived '{}' is defined twice", def.name));
            }
        }

        for name in &self.tier_normalized {
            if name == EFFECTIVE_DAYS || name == ENTITY_COUNT {
                return invalid(format!("'{}' cannot be tier-normalized", name));
            }
            if self.is_derived(name) {
                return invalid(format!(
                    "'{}' is a derived metric and cannot be tier-normalized",
                    name
                ));
            }
            if !known.contains(name) {
                return invalid(format!("tier normalization names unknown metric '{}'", name));
            }
        }

        for name in known.iter().map(String::as_str).chain(derived_seen.iter().copied()) {
            if self.display_name(name).is_none() {
                return invalid(format!("metric '{}' has no display name", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windowed_access() {
        let mut w = Windowed::new(1.0, 2.0, 3.0);
        *w.get_mut(Window::Prior) += 1.0;
        assert_eq!(*w.get(Window::Prior), 4.0);
        assert_eq!(*w.get(Window::Total), 1.0);
        assert_eq!(Window::Current.suffix(), "current");
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = MetricCatalog::standard();
        catalog.validate().unwrap();
        assert!(catalog.base_metrics().contains(&"natural_leads".to_string()));
        assert_eq!(
            catalog.aggregated_metrics().len(),
            catalog.base_metrics().len() + catalog.composites.len()
        );
    }

    #[test]
    fn test_derived_metric_cannot_be_tier_normalized() {
        let mut catalog = MetricCatalog::standard();
        catalog.tier_normalized.push("total_cpl".to_string());
        let err = catalog.validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidCatalog(ref m) if m.contains("derived")));

        let mut catalog = MetricCatalog::standard();
        catalog.tier_normalized.push(EFFECTIVE_DAYS.to_string());
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_derived_order_is_enforced() {
        let mut catalog = MetricCatalog::standard();
        catalog.derived.insert(
            0,
            DerivedDefinition {
                name: "early".to_string(),
                numerator: Operand::Derived("total_cpl".to_string()),
                denominator: Operand::EffectiveDays,
            },
        );
        catalog.display_names.insert("early".into(), "early".into());
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_missing_display_name_rejected() {
        let mut catalog = MetricCatalog::standard();
        catalog.display_names.remove("viewers");
        assert!(catalog.validate().is_err());
    }
}
