pub mod metric_catalog;
pub mod predicates;
pub mod source_kind;
pub mod standard;

pub use metric_catalog::{
    Composite, DateSource, DerivedDefinition, DimensionSpec, DisplayLabels, MetricCatalog,
    MetricColumn, Operand, PredicateMetric, SheetMode, SourceSpec, Window, Windowed,
};
pub use source_kind::SourceKind;
