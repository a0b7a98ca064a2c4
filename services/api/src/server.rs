use crate::cli::ServeArgs;
use crate::infra::{load_store, AppState};
use crate::routes::with_vacancy_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use staffing_gaps::config::AppConfig;
use staffing_gaps::error::AppError;
use staffing_gaps::telemetry;
use staffing_gaps::workflows::vacancy::{LogNotifier, NewEventPoller, VacancyService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(snapshot) = args.snapshot.take() {
        config.snapshot_dir = Some(snapshot);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = load_store(config.snapshot_dir.as_deref())?;
    let service = Arc::new(VacancyService::new(store.clone(), &config.reconciliation));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_task = if config.poller.enabled {
        let poller = Arc::new(NewEventPoller::new(
            store,
            Arc::new(LogNotifier),
            service.ingestor(),
            config.poller.interval(),
        ));
        let seeded = poller.init().await;
        info!(seeded, interval_secs = config.poller.interval_secs, "new-event poller started");
        Some(poller.spawn(shutdown_rx))
    } else {
        None
    };

    let app = with_vacancy_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "staffing gaps reconciliation service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    let _ = shutdown_tx.send(true);
    if let Some(task) = poller_task {
        if let Err(err) = task.await {
            tracing::warn!(%err, "poller task ended abnormally");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
