use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryTreatmentCatalog, InMemoryTrialCatalog};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use trial_match::config::AppConfig;
use trial_match::error::AppError;
use trial_match::matching::{MatchConfig, MatchingService};
use trial_match::telemetry;

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

    let trials = Arc::new(InMemoryTrialCatalog::seeded());
    let treatments = Arc::new(InMemoryTreatmentCatalog::seeded());
    let service = Arc::new(MatchingService::new(
        trials,
        treatments,
        MatchConfig::default(),
        config.matching,
    ));

    let app = with_matching_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "trial matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
