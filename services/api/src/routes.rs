use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use medreg::registration::{
    registration_router, AttachmentRepository, BlobStore, Notifier, RegistrationRepository,
    RegistrationService, RouterConfig,
};
use serde_json::json;
use std::sync::Arc;

/// Compose the registration endpoints with the operational surface.
pub(crate) fn with_registration_routes<R, A, B, N>(
    service: Arc<RegistrationService<R, A, B, N>>,
    config: RouterConfig,
) -> axum::Router
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    registration_router(service, config)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
