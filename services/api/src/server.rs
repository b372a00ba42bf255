use crate::cli::ServeArgs;
use crate::infra::{
    document_policy, AppState, InMemoryAttachmentRepository, InMemoryBlobStore,
    InMemoryRegistrationRepository, LoggingNotifier,
};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use medreg::config::AppConfig;
use medreg::error::AppError;
use medreg::registration::{RegistrationService, RouterConfig};
use medreg::telemetry;
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

    let registrations = Arc::new(InMemoryRegistrationRepository::default());
    let attachments = Arc::new(InMemoryAttachmentRepository::default());
    let blobs = Arc::new(InMemoryBlobStore::default());
    let notifier = Arc::new(LoggingNotifier::default());
    let service = Arc::new(RegistrationService::new(
        registrations,
        attachments,
        blobs,
        notifier,
        document_policy(&config.uploads),
    ));

    let router_config = RouterConfig {
        body_limit_bytes: config.uploads.body_limit_bytes,
        expose_error_detail: config.environment.exposes_error_detail(),
    };

    let app = with_registration_routes(service, router_config)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "registration service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
