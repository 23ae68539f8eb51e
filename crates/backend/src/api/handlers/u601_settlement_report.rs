use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u601_settlement_report::{
    CatalogResponse, SettlementReport, SettlementReportRequest, SettlementReportResponse,
};
use std::sync::Arc;

use crate::dashboards::d601_settlement::{Dimension, OutputPlan};
use crate::routes::AppState;
use crate::shared::errors::PipelineError;

/// Ошибка прогона в HTTP-ответе: статус по виду ошибки, тело UseCaseError
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidCatalog(_) | PipelineError::Worker(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PipelineError::Timeout(_) | PipelineError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(self.0.to_usecase_error())).into_response()
    }
}

/// POST /api/u601/settlement_report
pub async fn settlement_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SettlementReportRequest>,
) -> Result<Json<SettlementReportResponse>, ApiError> {
    tracing::info!(
        "{}: settlement report requested, dimension={:?}, {} sources",
        SettlementReport::full_name(),
        request.dimension,
        request.sources.len()
    );

    match state.executor.run(request).await {
        Ok(response) => {
            tracing::info!(
                "{}: run {} returned {} rows, {} warnings",
                SettlementReport::full_name(),
                response.run_id,
                response.rows.len(),
                response.warnings.len()
            );
            Ok(Json(response))
        }
        Err(e) => {
            tracing::error!(
                "{}: settlement report failed [{}]: {}",
                SettlementReport::full_name(),
                e.code(),
                e
            );
            Err(e.into())
        }
    }
}

/// GET /api/u601/catalog
pub async fn catalog(State(state): State<Arc<AppState>>) -> Result<Json<CatalogResponse>, ApiError> {
    let catalog = state.executor.catalog();
    let entity_columns = OutputPlan::for_dimension(catalog, Dimension::Entity)?.display_names();
    let tier_columns = OutputPlan::for_dimension(catalog, Dimension::Tier)?.display_names();

    Ok(Json(CatalogResponse {
        usecase: SettlementReport::info(),
        entity_columns,
        tier_columns,
    }))
}
