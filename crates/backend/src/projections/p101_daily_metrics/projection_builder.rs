use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tokio_util::sync::CancellationToken;

use super::table::{CanonicalTable, DailyKey};
use crate::shared::catalog::predicates::PredicateRow;
use crate::shared::catalog::{DateSource, SheetMode, SourceSpec};
use crate::shared::data::cells::{clean_attribute, parse_number, split_entity_ids};
use crate::shared::data::raw_table::{RawSheet, RawSource};
use crate::shared::dates::{parse_date_cell, parse_sheet_label};
use crate::shared::errors::PipelineError;

/// Как часто воркер проверяет отмену прогона
const CANCEL_CHECK_ROWS: usize = 4096;

/// Где брать дату строки
enum RowDate {
    Fixed(NaiveDate),
    Column(usize),
}

/// Column positions of one sheet, resolved against the source's column map
struct SheetLayout {
    entity: usize,
    date: RowDate,
    metrics: Vec<(String, usize)>,
    attributes: Vec<(String, usize)>,
}

impl SheetLayout {
    fn resolve(sheet: &RawSheet, spec: &SourceSpec) -> Result<Self, PipelineError> {
        let kind = spec.kind.as_str();
        let require = |column: &str| {
            sheet
                .column_index(column)
                .ok_or_else(|| PipelineError::missing_column(kind, column))
        };

        let entity = require(&spec.entity_column)?;
        let date = match &spec.date {
            DateSource::Column(column) => RowDate::Column(require(column)?),
            DateSource::SheetLabel => {
                let date = parse_sheet_label(&sheet.name).ok_or_else(|| {
                    PipelineError::DateParseError {
                        source_kind: kind.to_string(),
                        location: "sheet label".to_string(),
                        value: sheet.name.clone(),
                    }
                })?;
                RowDate::Fixed(date)
            }
        };

        let mut metrics = Vec::with_capacity(spec.metrics.len());
        for m in &spec.metrics {
            metrics.push((m.column.clone(), require(&m.column)?));
        }
        let mut attributes = Vec::with_capacity(spec.attributes.len());
        for a in &spec.attributes {
            attributes.push((a.name.clone(), require(&a.column)?));
        }

        Ok(Self {
            entity,
            date,
            metrics,
            attributes,
        })
    }
}

/// Sheets to read, in the caller's order
fn select_sheets<'a>(
    source: &'a RawSource,
    spec: &SourceSpec,
) -> Result<Vec<&'a RawSheet>, PipelineError> {
    let kind = source.kind.as_str();
    let selected = source
        .selected_sheets
        .as_ref()
        .filter(|names| !names.is_empty());

    match (spec.sheets, selected) {
        (SheetMode::Multi, None) => Err(PipelineError::MissingSheets {
            source_kind: kind.to_string(),
        }),
        (_, Some(names)) => names
            .iter()
            .map(|name| {
                source.sheet(name).ok_or_else(|| PipelineError::SheetNotFound {
                    source_kind: kind.to_string(),
                    sheet: name.clone(),
                })
            })
            .collect(),
        (SheetMode::Single, None) => Ok(source.sheets.iter().take(1).collect()),
    }
}

/// Нормализация одного источника в таблицу (entity_id, date) -> метрики.
///
/// Rows sharing a key are summed. A cell listing several ids is exploded:
/// every id receives the full row. Predicate metrics add 1.0 per matching row.
/// Returns `Cancelled` once `cancel` fires, checked per sheet and every few
/// thousand rows.
pub fn normalize_source(
    source: &RawSource,
    spec: &SourceSpec,
    cancel: &CancellationToken,
) -> Result<CanonicalTable, PipelineError> {
    let kind = source.kind.as_str();
    let metric_names = spec.metric_names();
    let width = metric_names.len();
    let mut records: BTreeMap<DailyKey, Vec<f64>> = BTreeMap::new();

    let mut total_rows = 0usize;
    let mut dropped_rows = 0usize;

    for sheet in select_sheets(source, spec)? {
        PipelineError::check_cancelled(cancel, kind)?;
        if sheet.is_blank() {
            tracing::warn!("[{}] sheet '{}' is empty, skipped", kind, sheet.name);
            continue;
        }
        let layout = SheetLayout::resolve(sheet, spec)?;

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            if row_idx % CANCEL_CHECK_ROWS == 0 {
                PipelineError::check_cancelled(cancel, kind)?;
            }
            total_rows += 1;
            // Номер строки как в Excel: заголовок = 1
            let line = row_idx + 2;
            let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

            let ids = split_entity_ids(cell(layout.entity));
            if ids.is_empty() {
                dropped_rows += 1;
                continue;
            }

            let date = match layout.date {
                RowDate::Fixed(date) => date,
                RowDate::Column(idx) => parse_date_cell(cell(idx)).ok_or_else(|| {
                    PipelineError::DateParseError {
                        source_kind: kind.to_string(),
                        location: format!("sheet '{}' row {}", sheet.name, line),
                        value: cell(idx).to_string(),
                    }
                })?,
            };

            let mut values = Vec::with_capacity(width);
            for (column, idx) in &layout.metrics {
                match parse_number(cell(*idx)) {
                    Ok(value) => values.push(value.unwrap_or(0.0)),
                    Err(text) => {
                        return Err(PipelineError::SchemaMismatch {
                            source_kind: kind.to_string(),
                            column: column.clone(),
                            reason: format!(
                                "non-numeric value '{}' in sheet '{}' row {}",
                                text, sheet.name, line
                            ),
                        })
                    }
                }
            }

            let fields: HashMap<String, String> = layout
                .attributes
                .iter()
                .filter_map(|(name, idx)| clean_attribute(cell(*idx)).map(|v| (name.clone(), v)))
                .collect();
            let mut predicate_row = PredicateRow {
                entity_id: String::new(),
                fields,
            };

            for id in ids {
                predicate_row.entity_id = id.clone();
                let slot = records
                    .entry((id, date))
                    .or_insert_with(|| vec![0.0; width]);

                for (acc, value) in slot.iter_mut().zip(values.iter()) {
                    *acc += value;
                }
                for (acc, p) in slot[values.len()..].iter_mut().zip(&spec.predicates) {
                    if (p.predicate)(&predicate_row) {
                        *acc += 1.0;
                    }
                }
            }
        }
    }

    let table = CanonicalTable::new(source.kind, metric_names, records);
    tracing::info!(
        "[{}] normalized: {} unique keys / {} rows, {} rows dropped without entity id",
        kind,
        table.len(),
        total_rows,
        dropped_rows
    );
    tracing::debug!("[{}] non-zero metrics: {:?}", kind, table.non_zero_counts());

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::catalog::{MetricCatalog, SourceKind};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sheet(name: &str, csv: &str) -> RawSheet {
        RawSheet::from_csv(name, csv).unwrap()
    }

    fn normalize(source: RawSource) -> Result<CanonicalTable, PipelineError> {
        let catalog = MetricCatalog::standard();
        let spec = catalog.source(source.kind).unwrap().clone();
        normalize_source(&source, &spec, &CancellationToken::new())
    }

    #[test]
    fn test_video_rows_are_summed_per_key() {
        let csv = "主机厂经销商id,日期,锚点曝光次数,锚点点击次数,新发布视频数,短视频表单提交商机量\n\
                   D1,2024-01-05,100,10,1,2\n\
                   D1,2024/1/5,\"1,000\",5,,1\n\
                   D2,2024-01-06,7,0,0,0\n\
                   null,2024-01-06,7,0,0,0\n";
        let table = normalize(RawSource::new(SourceKind::Video, vec![sheet("Sheet1", csv)])).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.value("D1", d(2024, 1, 5), "anchor_exposures"), Some(1100.0));
        assert_eq!(table.value("D1", d(2024, 1, 5), "short_video_count"), Some(1.0));
        assert_eq!(table.value("D2", d(2024, 1, 6), "anchor_exposures"), Some(7.0));
    }

    #[test]
    fn test_one_key_per_distinct_id_and_date() {
        let csv = "主机厂经销商id列表,留资日期,直播间表单提交商机量(去重)\n\
                   \"D1,D2\",2024-01-05,1\n\
                   D1,2024-01-05 18:00:00,1\n\
                   D2,20240105,1\n\
                   D2,2024-01-06,1\n\
                   \"D3|D1\",2024/1/6,1\n\
                   --,2024-01-06,1\n";
        let table = normalize(RawSource::new(SourceKind::Leads, vec![sheet("s", csv)])).unwrap();

        // (D1,05) (D2,05) (D2,06) (D3,06) (D1,06) после разбиения id
        let keys: Vec<(&str, NaiveDate)> = table.keys().map(|(id, date)| (id.as_str(), *date)).collect();
        assert_eq!(
            keys,
            vec![
                ("D1", d(2024, 1, 5)),
                ("D1", d(2024, 1, 6)),
                ("D2", d(2024, 1, 5)),
                ("D2", d(2024, 1, 6)),
                ("D3", d(2024, 1, 6)),
            ]
        );
        assert_eq!(table.value("D1", d(2024, 1, 5), "small_wheel_leads"), Some(2.0));
        assert_eq!(table.value("D2", d(2024, 1, 5), "small_wheel_leads"), Some(2.0));
    }

    #[test]
    fn test_multi_id_cell_is_exploded() {
        let csv = "主机厂经销商id列表,留资日期,直播间表单提交商机量(去重)\n\
                   \"D1,D2\",2024-01-05,4\n\
                   D2,2024-01-05,1\n";
        let table = normalize(RawSource::new(SourceKind::Leads, vec![sheet("s", csv)])).unwrap();
        assert_eq!(table.value("D1", d(2024, 1, 5), "small_wheel_leads"), Some(4.0));
        assert_eq!(table.value("D2", d(2024, 1, 5), "small_wheel_leads"), Some(5.0));
    }

    #[test]
    fn test_missing_column_names_it() {
        let csv = "主机厂经销商id列表,留资日期\nD1,2024-01-05\n";
        let err = normalize(RawSource::new(SourceKind::Leads, vec![sheet("s", csv)])).unwrap_err();
        match err {
            PipelineError::SchemaMismatch {
                source_kind,
                column,
                ..
            } => {
                assert_eq!(source_kind, "leads");
                assert_eq!(column, "直播间表单提交商机量(去重)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_in_numeric_column_is_rejected() {
        let csv = "主机厂经销商id列表,留资日期,直播间表单提交商机量(去重)\nD1,2024-01-05,many\n";
        let err = normalize(RawSource::new(SourceKind::Leads, vec![sheet("s", csv)])).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref reason, .. } if reason.contains("many")));
    }

    #[test]
    fn test_bad_date_cell_fails() {
        let csv = "主机厂经销商id列表,留资日期,直播间表单提交商机量(去重)\nD1,someday,1\n";
        let err = normalize(RawSource::new(SourceKind::Leads, vec![sheet("s", csv)])).unwrap_err();
        match err {
            PipelineError::DateParseError { location, value, .. } => {
                assert_eq!(location, "sheet 's' row 2");
                assert_eq!(value, "someday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_msg_takes_date_from_sheet_label() {
        let header = "主机厂经销商ID,进入私信客户数,主动咨询客户数,私信留资客户数\n";
        let source = RawSource::new(
            SourceKind::Msg,
            vec![
                sheet("2024-01-05", &format!("{header}D1,10,4,1\n")),
                sheet("2024-01-06", &format!("{header}D1,6,2,0\n")),
                sheet("notes", "x\n1\n"),
            ],
        )
        .with_selected(&["2024-01-05", "2024-01-06"]);

        let table = normalize(source).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.value("D1", d(2024, 1, 5), "enter_private_count"), Some(10.0));
        assert_eq!(table.value("D1", d(2024, 1, 6), "private_open_count"), Some(2.0));
    }

    #[test]
    fn test_multi_sheet_selection_errors() {
        let header = "主机厂经销商ID,进入私信客户数,主动咨询客户数,私信留资客户数\n";
        let sheets = vec![sheet("2024-01-05", &format!("{header}D1,1,1,1\n"))];

        let err = normalize(RawSource::new(SourceKind::Msg, sheets.clone())).unwrap_err();
        assert!(matches!(err, PipelineError::MissingSheets { .. }));

        let err = normalize(RawSource::new(SourceKind::Msg, sheets.clone()).with_selected(&[]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingSheets { .. }));

        let err = normalize(RawSource::new(SourceKind::Msg, sheets).with_selected(&["2024-01-07"]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::SheetNotFound { ref sheet, .. } if sheet == "2024-01-07"));
    }

    #[test]
    fn test_unparseable_sheet_label_fails() {
        let csv = "主机厂经销商ID,进入私信客户数,主动咨询客户数,私信留资客户数\nD1,1,1,1\n";
        let source = RawSource::new(SourceKind::Msg, vec![sheet("一月", csv)]).with_selected(&["一月"]);
        let err = normalize(source).unwrap_err();
        assert!(matches!(err, PipelineError::DateParseError { ref value, .. } if value == "一月"));
    }

    #[test]
    fn test_partial_sheet_labels_fail() {
        let csv = "主机厂经销商ID,进入私信客户数,主动咨询客户数,私信留资客户数\nD1,1,1,1\n";
        for label in ["105", "2024", "2024-01"] {
            let source = RawSource::new(SourceKind::Msg, vec![sheet(label, csv)]).with_selected(&[label]);
            match normalize(source).unwrap_err() {
                PipelineError::DateParseError { location, value, .. } => {
                    assert_eq!(location, "sheet label");
                    assert_eq!(value, label);
                }
                other => panic!("label {label}: unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_cancelled_run_stops_normalization() {
        let mut csv = String::from("NSC CODE,Date,Spending(Net)\n");
        for i in 0..10_000 {
            csv.push_str(&format!("D{},2024-01-05,1\n", i % 7));
        }
        let source = RawSource::new(SourceKind::Spending, vec![sheet("Jan", &csv)]).with_selected(&["Jan"]);
        let catalog = MetricCatalog::standard();
        let spec = catalog.source(SourceKind::Spending).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = normalize_source(&source, spec, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { ref source_kind } if source_kind == "spending"));
    }

    #[test]
    fn test_dr_predicates_count_rows() {
        let csv = "reg_dealer,register_time,leads_type,mkt_second_channel_name,send2dealer_id\n\
                   D1,2024-01-05 09:00:00,自然,其他,D1\n\
                   D1,2024-01-05 10:00:00,付费,抖音车云店_LS直发,D2\n\
                   D1,2024-01-05 11:00:00,付费,抖音车云店_BMW_总部BDT_LS直发,D1\n";
        let table = normalize(RawSource::new(SourceKind::Dr, vec![sheet("dr", csv)])).unwrap();
        let day = d(2024, 1, 5);

        assert_eq!(table.len(), 1);
        assert_eq!(table.value("D1", day, "natural_leads"), Some(1.0));
        assert_eq!(table.value("D1", day, "paid_leads"), Some(2.0));
        assert_eq!(table.value("D1", day, "store_paid_leads"), Some(1.0));
        assert_eq!(table.value("D1", day, "area_paid_leads"), Some(1.0));
        assert_eq!(table.value("D1", day, "local_leads"), Some(2.0));
    }

    #[test]
    fn test_spending_concatenates_selected_sheets() {
        let header = "NSC CODE,Date,Spending(Net)\n";
        let source = RawSource::new(
            SourceKind::Spending,
            vec![
                sheet("Jan", &format!("{header}D1,2024-01-05,100.5\n")),
                sheet("Feb", &format!("{header}D1,2024-01-05,50\nD1,2024-02-01,20\n")),
            ],
        )
        .with_selected(&["Jan", "Feb"]);
        let table = normalize(source).unwrap();
        assert_eq!(table.value("D1", d(2024, 1, 5), "spending_net"), Some(150.5));
        assert_eq!(table.value("D1", d(2024, 2, 1), "spending_net"), Some(20.0));
    }

    #[test]
    fn test_no_sheets_gives_empty_table() {
        let table = normalize(RawSource::new(SourceKind::Video, vec![])).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.metric_names.len(), 4);
    }
}
