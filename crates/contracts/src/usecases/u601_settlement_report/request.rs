use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Запрос на построение сводного отчёта
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReportRequest {
    /// Загруженные источники (каждый вид не более одного раза)
    pub sources: Vec<SourceUpload>,

    /// "entity" | "tier" (synonyms accepted by the backend); required
    #[serde(default)]
    pub dimension: Option<String>,

    #[serde(default)]
    pub current_window: Option<DateWindow>,

    #[serde(default)]
    pub prior_window: Option<DateWindow>,

    /// "YYYY-MM": current = this month, prior = previous month.
    /// Mutually exclusive with explicit windows.
    #[serde(default)]
    pub anchor_month: Option<String>,

    /// Overrides the configured tier normalization flag for this run
    #[serde(default)]
    pub normalize_tier_by_entity_count: Option<bool>,
}

/// One source workbook, already fetched, with its sheets as CSV text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUpload {
    /// video | live | msg | account_bi | leads | dr | spending | account_base
    pub kind: String,

    pub sheets: Vec<SheetUpload>,

    /// Sheet identifiers to read; required for multi-sheet sources
    #[serde(default)]
    pub selected_sheets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetUpload {
    pub name: String,
    /// CSV text, first record is the header
    pub content: String,
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(with = "serde_date")]
    pub start: NaiveDate,
    #[serde(with = "serde_date")]
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn overlaps(&self, other: &DateWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

// Local serde helper for NaiveDate as YYYY-MM-DD
mod serde_date {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.format(FORMAT).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
