#![allow(clippy::type_complexity, clippy::too_many_arguments)]

pub mod api;
pub mod dashboards;
pub mod projections;
pub mod routes;
pub mod shared;
pub mod usecases;

use std::sync::Arc;

use shared::catalog::MetricCatalog;
use usecases::u601_settlement_report::ReportExecutor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use axum::middleware::{self, Next};
    use axum::response::Response;
    use tokio::net::TcpListener;
    use tower_http::cors::{Any, CorsLayer};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Создаем директорию для логов
    let log_dir = std::path::Path::new("target").join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file_path = log_dir.join("backend.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false),
        )
        .init();

    // Простой middleware для логирования запросов
    async fn request_logger(req: Request<Body>, next: Next) -> Response {
        let start = std::time::Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = next.run(req).await;

        let status = response.status().as_u16();
        let duration = start.elapsed();
        if status < 400 {
            tracing::info!("{} {} -> {} ({}ms)", method, path, status, duration.as_millis());
        } else {
            tracing::warn!("{} {} -> {} ({}ms)", method, path, status, duration.as_millis());
        }
        response
    }

    let config = shared::config::load_config()?;
    tracing::info!("Request body limit: {} MB", config.server.max_body_mb);
    tracing::info!(
        "Pipeline settings: {} parallel sources, timeout {}s, tier normalization {}, ambiguity {:?}",
        config.pipeline.max_parallel_sources,
        config.pipeline.run_timeout_secs,
        config.pipeline.normalize_tier_by_entity_count,
        config.pipeline.ambiguity_policy
    );

    // Каталог проверяется один раз при старте
    let catalog = MetricCatalog::standard();
    catalog
        .validate()
        .map_err(|e| anyhow::anyhow!("metric catalog is invalid: {e}"))?;
    tracing::info!(
        "Metric catalog: {} sources, {} composites, {} derived metrics",
        catalog.sources.len(),
        catalog.composites.len(),
        catalog.derived.len()
    );

    let state = Arc::new(routes::AppState {
        executor: ReportExecutor::new(Arc::new(catalog), config.pipeline.clone()),
        max_body_bytes: config.server.max_body_bytes(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = routes::configure_routes(state)
        .layer(middleware::from_fn(request_logger))
        .layer(cors);

    let listener = match TcpListener::bind(&config.server.bind).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::error!(
                "Address {} is already in use. Stop the other backend instance or change [server].bind in config.toml",
                config.server.bind
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!("Server listening on {}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
