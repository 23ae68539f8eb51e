use contracts::shared::report_value::ReportValue;
use std::collections::HashMap;

use super::settlement::{FinalSettlement, SettlementRow};
use super::windows::Dimension;
use crate::shared::catalog::metric_catalog::{EFFECTIVE_DAYS, ENTITY_COUNT};
use crate::shared::catalog::{MetricCatalog, Window, Windowed};
use crate::shared::errors::PipelineError;

/// What a report column reads from a settlement row
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    Group,
    DisplayName,
    Tier,
    EntityCount(Window),
    EffectiveDays(Window),
    Metric(String, Window),
    Derived(String, Window),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    /// Internal key, e.g. `spending_net_current`
    pub key: String,
    pub display: String,
    pub source: ColumnSource,
}

/// Ordered column contract of one dimension
#[derive(Debug, Clone)]
pub struct OutputPlan {
    pub columns: Vec<OutputColumn>,
}

/// Flat rows keyed by the display-name columns
#[derive(Debug, Clone)]
pub struct FinalizedReport {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ReportValue>>,
}

fn windowed_key(name: &str, window: Window) -> String {
    format!("{}_{}", name, window.suffix())
}

fn windowed_display(catalog: &MetricCatalog, base: &str, window: Window) -> String {
    format!("{}{}", catalog.labels.window_prefixes.get(window), base)
}

fn metric_display<'a>(catalog: &'a MetricCatalog, name: &str) -> Result<&'a str, PipelineError> {
    catalog
        .display_name(name)
        .ok_or_else(|| PipelineError::InvalidCatalog(format!("metric '{}' has no display name", name)))
}

/// Windowed columns of `names`: total, current, prior per name
fn windowed_columns(
    catalog: &MetricCatalog,
    names: &[String],
    source: fn(String, Window) -> ColumnSource,
) -> Result<Vec<OutputColumn>, PipelineError> {
    let mut columns = Vec::with_capacity(names.len() * Window::ALL.len());
    for name in names {
        let base = metric_display(catalog, name)?;
        for window in Window::ALL {
            columns.push(OutputColumn {
                key: windowed_key(name, window),
                display: windowed_display(catalog, base, window),
                source: source(name.clone(), window),
            });
        }
    }
    Ok(columns)
}

fn key_column(key: &str, display: &str, source: ColumnSource) -> OutputColumn {
    OutputColumn {
        key: key.to_string(),
        display: display.to_string(),
        source,
    }
}

fn count_columns(
    catalog: &MetricCatalog,
    name: &str,
    label: &str,
    source: fn(Window) -> ColumnSource,
) -> Vec<OutputColumn> {
    Window::ALL
        .iter()
        .map(|window| OutputColumn {
            key: windowed_key(name, *window),
            display: windowed_display(catalog, label, *window),
            source: source(*window),
        })
        .collect()
}

/// Полная карта "внутренний ключ -> отображаемое имя" каталога
pub fn display_map(catalog: &MetricCatalog) -> Result<Vec<OutputColumn>, PipelineError> {
    let labels = &catalog.labels;
    let mut columns = vec![
        key_column("entity_id", &labels.entity_id, ColumnSource::Group),
        key_column("display_name", &labels.display_name, ColumnSource::DisplayName),
        key_column("tier", &labels.tier, ColumnSource::Tier),
    ];
    columns.extend(count_columns(catalog, ENTITY_COUNT, &labels.entity_count, ColumnSource::EntityCount));
    columns.extend(count_columns(
        catalog,
        EFFECTIVE_DAYS,
        &labels.effective_days,
        ColumnSource::EffectiveDays,
    ));
    columns.extend(windowed_columns(catalog, &catalog.aggregated_metrics(), ColumnSource::Metric)?);
    let derived: Vec<String> = catalog.derived.iter().map(|d| d.name.clone()).collect();
    columns.extend(windowed_columns(catalog, &derived, ColumnSource::Derived)?);
    Ok(columns)
}

/// Two internal keys sharing a display name block the whole output
pub fn validate_display_map(columns: &[OutputColumn]) -> Result<(), PipelineError> {
    let mut seen: HashMap<&str, Vec<&str>> = HashMap::new();
    for column in columns {
        seen.entry(column.display.as_str())
            .or_default()
            .push(column.key.as_str());
    }
    for column in columns {
        if let Some(keys) = seen.get(column.display.as_str()) {
            if keys.len() > 1 {
                return Err(PipelineError::DuplicateDisplayName {
                    display_name: column.display.clone(),
                    keys: keys.iter().map(|k| k.to_string()).collect(),
                });
            }
        }
    }
    Ok(())
}

impl OutputPlan {
    /// Column order: keys, effective days, sums, derived metrics
    pub fn for_dimension(catalog: &MetricCatalog, dimension: Dimension) -> Result<Self, PipelineError> {
        let all = display_map(catalog)?;
        validate_display_map(&all)?;

        let columns = all
            .into_iter()
            .filter(|c| match (&c.source, dimension) {
                (ColumnSource::DisplayName, Dimension::Tier) => false,
                (ColumnSource::EntityCount(_), Dimension::Entity) => false,
                _ => true,
            })
            .collect::<Vec<_>>();

        // Для уровня: сначала уровень, потом число магазинов
        let columns = match dimension {
            Dimension::Entity => columns,
            Dimension::Tier => {
                let (mut keys, rest): (Vec<_>, Vec<_>) = columns
                    .into_iter()
                    .partition(|c| matches!(c.source, ColumnSource::Tier | ColumnSource::Group));
                keys.retain(|c| c.source == ColumnSource::Tier);
                keys.extend(rest);
                keys
            }
        };

        Ok(Self { columns })
    }

    pub fn display_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.display.clone()).collect()
    }
}

/// Единственный способ превратить строку расчёта в плоскую запись
pub fn flatten_row(row: &SettlementRow, plan: &OutputPlan) -> Vec<ReportValue> {
    let windowed = |values: Option<&Windowed<f64>>, window: Window| {
        ReportValue::from(values.map_or(0.0, |w| *w.get(window)))
    };

    plan.columns
        .iter()
        .map(|column| match &column.source {
            ColumnSource::Group => ReportValue::Text(row.group.clone()),
            ColumnSource::DisplayName => ReportValue::from(row.display_name.clone()),
            ColumnSource::Tier => ReportValue::from(row.tier.clone()),
            ColumnSource::EntityCount(window) => windowed(row.entity_count.as_ref(), *window),
            ColumnSource::EffectiveDays(window) => windowed(Some(&row.effective_days), *window),
            ColumnSource::Metric(name, window) => windowed(row.metric(name), *window),
            ColumnSource::Derived(name, window) => windowed(row.derived(name), *window),
        })
        .collect()
}

/// Rename to display names in contract order. A display-name collision
/// fails the run before any row is produced.
pub fn finalize(
    settlement: &FinalSettlement,
    catalog: &MetricCatalog,
) -> Result<FinalizedReport, PipelineError> {
    let plan = OutputPlan::for_dimension(catalog, settlement.dimension())?;
    let rows = settlement
        .rows()
        .iter()
        .map(|row| flatten_row(row, &plan))
        .collect();

    Ok(FinalizedReport {
        columns: plan.display_names(),
        rows,
    })
}
