use std::collections::HashMap;

use super::key_union::union_keys;
use super::table::{WideRow, WideTable};
use crate::projections::p101_daily_metrics::CanonicalTable;
use crate::projections::p102_dealer_dimension::{DimensionRecord, DimensionTable};
use crate::shared::errors::PipelineError;

fn dimension_index(
    dimension: &DimensionTable,
) -> Result<HashMap<&str, &DimensionRecord>, PipelineError> {
    let mut index = HashMap::with_capacity(dimension.len());
    for record in dimension.records() {
        if index.insert(record.entity_id.as_str(), record).is_some() {
            return Err(PipelineError::UniquenessViolation {
                context: "dimension join".to_string(),
                key: record.entity_id.clone(),
            });
        }
    }
    Ok(index)
}

/// Широкая таблица: мастер-ключи, левое соединение со всеми источниками
/// (пропуски = 0.0) и со справочником по entity_id.
///
/// `metric_order` fixes the leading columns; metrics of tables not listed
/// there are appended in table order.
pub fn build_wide_table(
    tables: &[CanonicalTable],
    dimension: &DimensionTable,
    metric_order: &[String],
) -> Result<WideTable, PipelineError> {
    let mut metric_names: Vec<String> = metric_order.to_vec();
    let mut columns: Vec<Vec<usize>> = Vec::with_capacity(tables.len());
    for table in tables {
        let mut mapping = Vec::with_capacity(table.metric_names.len());
        for name in &table.metric_names {
            let idx = match metric_names.iter().position(|m| m == name) {
                Some(idx) => idx,
                None => {
                    metric_names.push(name.clone());
                    metric_names.len() - 1
                }
            };
            mapping.push(idx);
        }
        columns.push(mapping);
    }

    let dimension = dimension_index(dimension)?;
    let keys = union_keys(tables);
    let width = metric_names.len();

    let mut rows = Vec::with_capacity(keys.len());
    for key in &keys {
        let mut values = vec![0.0; width];
        for (table, mapping) in tables.iter().zip(&columns) {
            if let Some(source_values) = table.records.get(key) {
                for (value, idx) in source_values.iter().zip(mapping) {
                    values[*idx] += value;
                }
            }
        }

        let record = dimension.get(key.0.as_str());
        rows.push(WideRow {
            entity_id: key.0.clone(),
            date: key.1,
            values,
            tier: record.and_then(|r| r.tier.clone()),
            display_name: record.and_then(|r| r.display_name.clone()),
        });
    }

    tracing::info!(
        "wide table: {} sources, {} master keys, {} rows, {} metrics",
        tables.len(),
        keys.len(),
        rows.len(),
        width
    );

    Ok(WideTable { metric_names, rows })
}
