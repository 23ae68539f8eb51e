use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u601_settlement_report::{
    SettlementReport, SettlementReportRequest, SettlementReportResponse, SourceUpload,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::dashboards::d601_settlement::{
    compute_derived, finalize, normalize_tiers, settle, Dimension, ReportWindows,
};
use crate::projections::p101_daily_metrics::{normalize_source, CanonicalTable};
use crate::projections::p102_dealer_dimension::{build_dimension_table, DimensionBuild};
use crate::projections::p103_wide_table::build_wide_table;
use crate::shared::catalog::{MetricCatalog, SourceKind};
use crate::shared::config::{AmbiguityPolicy, PipelineSettings};
use crate::shared::data::raw_table::{RawSheet, RawSource};
use crate::shared::errors::PipelineError;

/// Результат нормализации одного источника
enum SourceOutput {
    Daily(CanonicalTable),
    Dimension(DimensionBuild),
}

struct NormalizedSources {
    tables: Vec<CanonicalTable>,
    dimension: Option<DimensionBuild>,
}

/// Executor для UseCase сводного отчёта
pub struct ReportExecutor {
    catalog: Arc<MetricCatalog>,
    settings: PipelineSettings,
}

impl ReportExecutor {
    pub fn new(catalog: Arc<MetricCatalog>, settings: PipelineSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Полный прогон: нормализация источников параллельно, затем
    /// соединение, агрегация, производные метрики, нормализация уровней.
    pub async fn run(
        &self,
        request: SettlementReportRequest,
    ) -> Result<SettlementReportResponse, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "report_run",
            usecase = %SettlementReport::full_name(),
            run_id = %run_id
        );
        self.run_inner(run_id, request).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: String,
        request: SettlementReportRequest,
    ) -> Result<SettlementReportResponse, PipelineError> {
        let started = std::time::Instant::now();

        // Валидация запроса до тяжёлой работы
        let dimension = Dimension::from_request(request.dimension.as_deref())?;
        let windows = ReportWindows::resolve(
            request.current_window,
            request.prior_window,
            request.anchor_month.as_deref(),
        )?;
        let uploads = self.classify_uploads(request.sources)?;
        tracing::info!(
            "starting report: dimension={}, {} sources, windows={:?}",
            dimension.as_str(),
            uploads.len(),
            windows
        );

        let mut warnings = Vec::new();
        let provided: HashSet<SourceKind> = uploads.iter().map(|(kind, _)| *kind).collect();
        for spec in &self.catalog.sources {
            if !provided.contains(&spec.kind) {
                warnings.push(format!("source '{}' not provided, its metrics are 0", spec.kind));
            }
        }

        let cancel = CancellationToken::new();
        let normalized = self.normalize_all(&run_id, uploads, &cancel).await?;
        let dimension_build = match normalized.dimension {
            Some(build) => build,
            None => {
                warnings.push("dealer workbook not provided, tier and store name are empty".to_string());
                DimensionBuild::not_provided()
            }
        };
        warnings.extend(dimension_build.warnings.iter().cloned());

        let wide = build_wide_table(
            &normalized.tables,
            &dimension_build.table,
            &self.catalog.base_metrics(),
        )?;

        let aggregated = settle(
            &wide,
            dimension,
            &windows,
            &self.catalog,
            &self.settings.unknown_tier_label,
        );
        let derived = compute_derived(aggregated, &self.catalog);
        let normalize = request
            .normalize_tier_by_entity_count
            .unwrap_or(self.settings.normalize_tier_by_entity_count);
        let settlement = normalize_tiers(derived, &self.catalog, normalize);
        let report = finalize(&settlement, &self.catalog)?;

        tracing::info!(
            "report finished: {} rows x {} columns in {}ms",
            report.rows.len(),
            report.columns.len(),
            started.elapsed().as_millis()
        );

        Ok(SettlementReportResponse {
            run_id,
            dimension: dimension.as_str().to_string(),
            columns: report.columns,
            rows: report.rows,
            warnings,
            dimension_status: dimension_build.status,
        })
    }

    /// Source kinds must be known and unique per request
    fn classify_uploads(
        &self,
        sources: Vec<SourceUpload>,
    ) -> Result<Vec<(SourceKind, SourceUpload)>, PipelineError> {
        let mut seen = HashSet::new();
        let mut uploads = Vec::with_capacity(sources.len());
        for upload in sources {
            let kind: SourceKind = upload.kind.parse()?;
            if !seen.insert(kind) {
                return Err(PipelineError::InvalidRequest(format!(
                    "source kind '{}' uploaded more than once",
                    kind
                )));
            }
            if !kind.is_dimension() && self.catalog.source(kind).is_none() {
                return Err(PipelineError::InvalidRequest(format!(
                    "source kind '{}' has no column map in the catalog",
                    kind
                )));
            }
            uploads.push((kind, upload));
        }
        Ok(uploads)
    }

    /// Каждый источник в своём blocking-потоке, не больше max_parallel_sources
    /// одновременно. При выходе (успех, ошибка, таймаут, drop future)
    /// `cancel` срабатывает и blocking-потоки останавливаются на ближайшей
    /// проверке.
    async fn normalize_all(
        &self,
        run_id: &str,
        uploads: Vec<(SourceKind, SourceUpload)>,
        cancel: &CancellationToken,
    ) -> Result<NormalizedSources, PipelineError> {
        let _stop_workers = cancel.clone().drop_guard();
        let semaphore = Arc::new(Semaphore::new(self.settings.max_parallel_sources.max(1)));
        let mut workers: JoinSet<Result<SourceOutput, PipelineError>> = JoinSet::new();

        for (kind, upload) in uploads {
            let semaphore = semaphore.clone();
            let catalog = self.catalog.clone();
            let policy = self.settings.ambiguity_policy;
            let cancel = cancel.clone();
            let span = tracing::info_span!("source", run_id = %run_id, kind = %kind);

            workers.spawn(async move {
                let permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| PipelineError::Worker(e.to_string()))?;
                // permit освобождается только когда blocking-поток закончил
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    span.in_scope(|| normalize_upload(kind, upload, &catalog, policy, &cancel))
                })
                .await
                .map_err(|e| PipelineError::Worker(format!("[{}] {}", kind, e)))?
            });
        }

        let timeout_secs = self.settings.run_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), collect(&mut workers)).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                workers.abort_all();
                tracing::error!("normalization exceeded {}s, in-flight sources cancelled", timeout_secs);
                Err(PipelineError::Timeout(timeout_secs))
            }
        }
    }
}

/// Ждём все источники: объединение ключей требует полного набора таблиц
async fn collect(
    workers: &mut JoinSet<Result<SourceOutput, PipelineError>>,
) -> Result<NormalizedSources, PipelineError> {
    let mut tables = Vec::new();
    let mut dimension = None;

    while let Some(joined) = workers.join_next().await {
        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                workers.abort_all();
                return Err(e);
            }
            Err(e) => {
                workers.abort_all();
                return Err(PipelineError::Worker(e.to_string()));
            }
        };
        match output {
            SourceOutput::Daily(table) => tables.push(table),
            SourceOutput::Dimension(build) => dimension = Some(build),
        }
    }

    // Порядок завершения случаен, порядок таблиц - нет
    tables.sort_by_key(|t| t.kind);
    Ok(NormalizedSources { tables, dimension })
}

fn decode_sheets(
    kind: SourceKind,
    upload: &SourceUpload,
    cancel: &CancellationToken,
) -> Result<Vec<RawSheet>, PipelineError> {
    upload
        .sheets
        .iter()
        .map(|sheet| {
            RawSheet::from_csv_cancellable(&sheet.name, &sheet.content, cancel)
                .map_err(|e| PipelineError::Decode {
                    source_kind: kind.to_string(),
                    sheet: sheet.name.clone(),
                    message: e.to_string(),
                })?
                .ok_or_else(|| PipelineError::Cancelled {
                    source_kind: kind.to_string(),
                })
        })
        .collect()
}

fn normalize_upload(
    kind: SourceKind,
    upload: SourceUpload,
    catalog: &MetricCatalog,
    policy: AmbiguityPolicy,
    cancel: &CancellationToken,
) -> Result<SourceOutput, PipelineError> {
    let sheets = decode_sheets(kind, &upload, cancel)?;

    if kind.is_dimension() {
        return build_dimension_table(&sheets, &catalog.dimension, policy, cancel)
            .map(SourceOutput::Dimension);
    }

    let spec = catalog.source(kind).ok_or_else(|| {
        PipelineError::InvalidRequest(format!("source kind '{}' has no column map", kind))
    })?;
    let source = RawSource {
        kind,
        sheets,
        selected_sheets: upload.selected_sheets,
    };
    normalize_source(&source, spec, cancel).map(SourceOutput::Daily)
}
