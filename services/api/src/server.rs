use crate::cli::ServeArgs;
use crate::infra::{funding_state, AppState};
use crate::routes::with_funding_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use legal_funding::config::AppConfig;
use legal_funding::error::AppError;
use legal_funding::telemetry;
use legal_funding::workflows::funding::{seed_demo, InMemoryRecordStore};
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
    if args.seed_demo {
        config.seed_demo = true;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryRecordStore::new());
    if config.seed_demo {
        let seed = seed_demo(store.as_ref())?;
        info!(
            lender = %seed.lender.name,
            borrower = %seed.borrower.name,
            applications = seed.applications.len(),
            "demo records loaded"
        );
    }

    let app = with_funding_routes(funding_state(store, config.lending.clone()))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "legal funding service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
