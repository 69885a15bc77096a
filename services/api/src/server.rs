use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingDispatcher, SeedFile};
use crate::routes::with_hiring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campus_trust::config::AppConfig;
use campus_trust::error::AppError;
use campus_trust::telemetry;
use campus_trust::workflows::hiring::{HiringService, InMemoryHiringStore};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = InMemoryHiringStore::new();
    if let Some(path) = args.seed.take() {
        let seeded = SeedFile::load(&path)?.apply(&store, Utc::now())?;
        info!(profiles = seeded, seed = %path.display(), "seeded in-memory store");
    }
    let hiring_service = Arc::new(HiringService::new(
        Arc::new(store),
        Arc::new(LoggingDispatcher),
        config.hiring,
    ));

    let app = with_hiring_routes(hiring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cascade_max_attempts = config.hiring.cascade_max_attempts,
        "campus trust service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
