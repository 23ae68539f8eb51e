use chrono::NaiveDate;

/// Строка широкой таблицы: один ключ (entity_id, date), все метрики всех источников
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub entity_id: String,
    pub date: NaiveDate,
    /// Aligned with `WideTable::metric_names`, zero-filled
    pub values: Vec<f64>,
    pub tier: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WideTable {
    pub metric_names: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metric_names.iter().position(|m| m == metric)
    }

    pub fn row(&self, entity_id: &str, date: NaiveDate) -> Option<&WideRow> {
        self.rows
            .iter()
            .find(|r| r.entity_id == entity_id && r.date == date)
    }

    pub fn value(&self, entity_id: &str, date: NaiveDate, metric: &str) -> Option<f64> {
        let idx = self.metric_index(metric)?;
        self.row(entity_id, date).and_then(|r| r.values.get(idx).copied())
    }
}
