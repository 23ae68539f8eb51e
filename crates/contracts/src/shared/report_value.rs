use serde::{Deserialize, Serialize};

/// Single cell of a finalized report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportValue {
    Number(f64),
    Text(String),
    Null,
}

impl From<f64> for ReportValue {
    fn from(value: f64) -> Self {
        ReportValue::Number(value)
    }
}

impl From<Option<String>> for ReportValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => ReportValue::Text(s),
            None => ReportValue::Null,
        }
    }
}
