use serde::{Deserialize, Serialize};

use crate::shared::report_value::ReportValue;
use crate::usecases::common::UseCaseInfo;

/// Finalized report: `columns` is the display-name contract, every row is
/// aligned with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReportResponse {
    pub run_id: String,
    /// "entity" | "tier"
    pub dimension: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ReportValue>>,
    pub warnings: Vec<String>,
    pub dimension_status: DimensionStatus,
}

/// How each dealer-dimension role was resolved from the uploaded workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionStatus {
    pub tier_sheet: RoleResolution,
    pub store_sheet: RoleResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoleResolution {
    Found { sheet: String },
    /// No sheet carried the role's column signature
    Missing,
    /// Several sheets matched; `used` is the first in upload order
    Ambiguous { sheets: Vec<String>, used: String },
    /// No dimension workbook was uploaded at all
    NotProvided,
}

/// Column contracts of the active catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub usecase: UseCaseInfo,
    pub entity_columns: Vec<String>,
    pub tier_columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_resolution_is_tagged() {
        let json = serde_json::to_string(&RoleResolution::Ambiguous {
            sheets: vec!["A".into(), "B".into()],
            used: "A".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"ambiguous","sheets":["A","B"],"used":"A"}"#);

        let json = serde_json::to_string(&RoleResolution::Missing).unwrap();
        assert_eq!(json, r#"{"status":"missing"}"#);
    }
}
