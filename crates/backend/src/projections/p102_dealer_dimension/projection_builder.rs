use contracts::usecases::u601_settlement_report::{DimensionStatus, RoleResolution};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use super::table::{DimensionRecord, DimensionTable};
use crate::shared::catalog::DimensionSpec;
use crate::shared::config::AmbiguityPolicy;
use crate::shared::data::cells::{clean_attribute, split_entity_ids};
use crate::shared::data::raw_table::RawSheet;
use crate::shared::errors::PipelineError;

/// Роль листа в справочнике дилеров
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionRole {
    Tier,
    Store,
}

impl DimensionRole {
    /// Attribute merge order: the first non-empty value wins
    pub const MERGE_ORDER: [DimensionRole; 2] = [DimensionRole::Tier, DimensionRole::Store];

    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionRole::Tier => "tier",
            DimensionRole::Store => "store",
        }
    }

    fn entity_column<'a>(&self, spec: &'a DimensionSpec) -> &'a str {
        match self {
            DimensionRole::Tier => &spec.tier_entity_column,
            DimensionRole::Store => &spec.store_entity_column,
        }
    }

    fn signature<'a>(&self, spec: &'a DimensionSpec) -> [&'a str; 2] {
        match self {
            DimensionRole::Tier => [&spec.tier_entity_column, &spec.tier_column],
            DimensionRole::Store => [&spec.store_entity_column, &spec.store_name_column],
        }
    }
}

/// Dimension table plus the diagnostics of sheet classification
#[derive(Debug, Clone)]
pub struct DimensionBuild {
    pub table: DimensionTable,
    pub status: DimensionStatus,
    pub warnings: Vec<String>,
}

impl DimensionBuild {
    /// No dealer workbook in the request
    pub fn not_provided() -> Self {
        Self {
            table: DimensionTable::default(),
            status: DimensionStatus {
                tier_sheet: RoleResolution::NotProvided,
                store_sheet: RoleResolution::NotProvided,
            },
            warnings: Vec::new(),
        }
    }
}

/// Pick the sheet serving `role` according to the ambiguity policy
fn resolve_role<'a>(
    role: DimensionRole,
    matches: &[&'a RawSheet],
    policy: AmbiguityPolicy,
    warnings: &mut Vec<String>,
) -> Result<(RoleResolution, Option<&'a RawSheet>), PipelineError> {
    let names: Vec<String> = matches.iter().map(|s| s.name.clone()).collect();
    match matches {
        [single] => Ok((
            RoleResolution::Found {
                sheet: single.name.clone(),
            },
            Some(*single),
        )),
        _ if policy == AmbiguityPolicy::Fail => Err(PipelineError::AmbiguousClassification {
            role: role.as_str().to_string(),
            matches: names,
        }),
        [] => {
            let message = format!("no {} sheet found in dealer workbook", role.as_str());
            tracing::warn!("{}", message);
            warnings.push(message);
            Ok((RoleResolution::Missing, None))
        }
        [first, ..] => {
            let message = format!(
                "{} sheets matched role '{}': {:?}; using '{}'",
                names.len(),
                role.as_str(),
                names,
                first.name
            );
            tracing::warn!("{}", message);
            warnings.push(message);
            Ok((
                RoleResolution::Ambiguous {
                    sheets: names,
                    used: first.name.clone(),
                },
                Some(*first),
            ))
        }
    }
}

/// Keep the existing value; a different non-empty value is a conflict
fn merge_attribute(
    slot: &mut Option<String>,
    incoming: Option<String>,
    context: &str,
    key: &str,
) -> Result<(), PipelineError> {
    match (slot.as_ref(), incoming) {
        (Some(current), Some(value)) if *current != value => {
            Err(PipelineError::UniquenessViolation {
                context: context.to_string(),
                key: key.to_string(),
            })
        }
        (None, Some(value)) => {
            *slot = Some(value);
            Ok(())
        }
        _ => Ok(()),
    }
}

const CANCEL_CHECK_ROWS: usize = 4096;

/// Read one role sheet. Rows repeating an entity must agree on every attribute.
fn extract_role(
    sheet: &RawSheet,
    role: DimensionRole,
    spec: &DimensionSpec,
    cancel: &CancellationToken,
) -> Result<BTreeMap<String, DimensionRecord>, PipelineError> {
    let entity_column = role.entity_column(spec);
    let entity_idx = sheet
        .column_index(entity_column)
        .ok_or_else(|| PipelineError::missing_column("account_base", entity_column))?;
    // Лист может нести и атрибут другой роли
    let tier_idx = sheet.column_index(&spec.tier_column);
    let name_idx = sheet.column_index(&spec.store_name_column);
    let context = format!("{} sheet '{}'", role.as_str(), sheet.name);

    let mut records: BTreeMap<String, DimensionRecord> = BTreeMap::new();
    for row_idx in 0..sheet.rows.len() {
        if row_idx % CANCEL_CHECK_ROWS == 0 {
            PipelineError::check_cancelled(cancel, "account_base")?;
        }
        let attribute = |idx: Option<usize>| idx.and_then(|i| clean_attribute(sheet.cell(row_idx, i)));
        for id in split_entity_ids(sheet.cell(row_idx, entity_idx)) {
            let record = records.entry(id.clone()).or_insert_with(|| DimensionRecord {
                entity_id: id.clone(),
                ..Default::default()
            });
            merge_attribute(&mut record.tier, attribute(tier_idx), &context, &id)?;
            merge_attribute(&mut record.display_name, attribute(name_idx), &context, &id)?;
        }
    }
    Ok(records)
}

/// Справочник дилеров: классификация листов по сигнатуре колонок,
/// внешнее объединение ролей по entity_id.
pub fn build_dimension_table(
    sheets: &[RawSheet],
    spec: &DimensionSpec,
    policy: AmbiguityPolicy,
    cancel: &CancellationToken,
) -> Result<DimensionBuild, PipelineError> {
    let mut warnings = Vec::new();
    let mut resolutions = Vec::with_capacity(DimensionRole::MERGE_ORDER.len());
    let mut merged: BTreeMap<String, DimensionRecord> = BTreeMap::new();

    for role in DimensionRole::MERGE_ORDER {
        let matches: Vec<&RawSheet> = sheets
            .iter()
            .filter(|s| s.has_columns(&role.signature(spec)))
            .collect();
        tracing::info!(
            "account_base: {} role matched sheets {:?}",
            role.as_str(),
            matches.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
        );

        let (resolution, chosen) = resolve_role(role, &matches, policy, &mut warnings)?;
        resolutions.push(resolution);

        let Some(sheet) = chosen else { continue };
        for (id, record) in extract_role(sheet, role, spec, cancel)? {
            let slot = merged.entry(id).or_insert_with(|| DimensionRecord {
                entity_id: record.entity_id.clone(),
                ..Default::default()
            });
            if slot.tier.is_none() {
                slot.tier = record.tier;
            }
            if slot.display_name.is_none() {
                slot.display_name = record.display_name;
            }
        }
    }

    let mut resolutions = resolutions.into_iter();
    let status = DimensionStatus {
        tier_sheet: resolutions.next().unwrap_or(RoleResolution::Missing),
        store_sheet: resolutions.next().unwrap_or(RoleResolution::Missing),
    };

    let table = DimensionTable::from_records(merged.into_values().collect());
    tracing::info!("account_base: {} dealers in dimension table", table.len());

    Ok(DimensionBuild {
        table,
        status,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::catalog::MetricCatalog;

    fn sheet(name: &str, csv: &str) -> RawSheet {
        RawSheet::from_csv(name, csv).unwrap()
    }

    fn spec() -> DimensionSpec {
        MetricCatalog::standard().dimension
    }

    fn build(sheets: &[RawSheet], policy: AmbiguityPolicy) -> Result<DimensionBuild, PipelineError> {
        build_dimension_table(sheets, &spec(), policy, &CancellationToken::new())
    }

    #[test]
    fn test_roles_are_outer_joined() {
        let sheets = vec![
            sheet("说明", "备注\nhello\n"),
            sheet("层级", "NSC_id,第二期层级\nD1,L1\nD2,L2\nD1,L1\n"),
            sheet("门店", "nsc code,抖音ID\nD2,Store Two\nD3,Store Three\n"),
        ];
        let build = build(&sheets, AmbiguityPolicy::Fail).unwrap();

        assert_eq!(build.table.len(), 3);
        assert_eq!(build.table.get("D1"), Some(&DimensionRecord::new("D1", Some("L1"), None)));
        assert_eq!(
            build.table.get("D2"),
            Some(&DimensionRecord::new("D2", Some("L2"), Some("Store Two")))
        );
        assert_eq!(
            build.table.get("D3"),
            Some(&DimensionRecord::new("D3", None, Some("Store Three")))
        );
        assert_eq!(
            build.status.tier_sheet,
            RoleResolution::Found {
                sheet: "层级".to_string()
            }
        );
        assert!(build.warnings.is_empty());
    }

    #[test]
    fn test_tier_sheet_wins_attribute_ties() {
        let sheets = vec![
            sheet("门店", "NSC Code,抖音id,第二期层级\nD1,Store,L9\n"),
            sheet("层级", "NSC_id,第二期层级,抖音id\nD1,L1,\n"),
        ];
        let build = build(&sheets, AmbiguityPolicy::Fail).unwrap();
        assert_eq!(
            build.table.get("D1"),
            Some(&DimensionRecord::new("D1", Some("L1"), Some("Store")))
        );
    }

    #[test]
    fn test_conflicting_duplicate_is_fatal() {
        let sheets = vec![sheet("层级", "NSC_id,第二期层级\nD1,L1\nD1,L2\n")];
        let err = build(&sheets, AmbiguityPolicy::Warn).unwrap_err();
        assert!(matches!(err, PipelineError::UniquenessViolation { ref key, .. } if key == "D1"));
    }

    #[test]
    fn test_blank_duplicate_fills_in() {
        let sheets = vec![sheet("层级", "NSC_id,第二期层级\nD1,\nD1,L1\n")];
        let build = build(&sheets, AmbiguityPolicy::Warn).unwrap();
        assert_eq!(build.table.get("D1").unwrap().tier.as_deref(), Some("L1"));
    }

    #[test]
    fn test_ambiguity_policy() {
        let sheets = vec![
            sheet("A", "NSC_id,第二期层级\nD1,L1\n"),
            sheet("B", "NSC_id,第二期层级\nD1,L2\n"),
        ];

        let err = build(&sheets, AmbiguityPolicy::Fail).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AmbiguousClassification { ref role, ref matches } if role == "tier" && matches.len() == 2
        ));

        let build = build(&sheets, AmbiguityPolicy::Warn).unwrap();
        assert_eq!(
            build.status.tier_sheet,
            RoleResolution::Ambiguous {
                sheets: vec!["A".into(), "B".into()],
                used: "A".into()
            }
        );
        assert_eq!(build.status.store_sheet, RoleResolution::Missing);
        assert_eq!(build.warnings.len(), 2);
        assert_eq!(build.table.get("D1").unwrap().tier.as_deref(), Some("L1"));
    }

    #[test]
    fn test_missing_role_fails_under_strict_policy() {
        let sheets = vec![sheet("层级", "NSC_id,第二期层级\nD1,L1\n")];
        let err = build(&sheets, AmbiguityPolicy::Fail).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AmbiguousClassification { ref role, ref matches } if role == "store" && matches.is_empty()
        ));
    }

    #[test]
    fn test_cancelled_build_stops() {
        let sheets = vec![
            sheet("层级", "NSC_id,第二期层级\nD1,L1\n"),
            sheet("门店", "NSC Code,抖音id\nD1,Store\n"),
        ];
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = build_dimension_table(&sheets, &spec(), AmbiguityPolicy::Warn, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { ref source_kind } if source_kind == "account_base"));
    }
}
