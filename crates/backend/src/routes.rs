use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u601_settlement_report::SettlementReport;
use std::sync::Arc;

use crate::api::handlers;
use crate::usecases::u601_settlement_report::ReportExecutor;

/// Общее состояние обработчиков
pub struct AppState {
    pub executor: ReportExecutor,
    /// `[server] max_body_mb` в байтах
    pub max_body_bytes: usize,
}

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // U601 SETTLEMENT REPORT
        // ========================================
        .route(
            &SettlementReport::api_path("settlement_report"),
            post(handlers::u601_settlement_report::settlement_report),
        )
        .route(
            &SettlementReport::api_path("catalog"),
            get(handlers::u601_settlement_report::catalog),
        )
        // вместо дефолтных 2 МБ axum
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
