//! HTTP surface for registration intake, review, and document uploads.
//!
//! Authentication itself is an upstream concern: the gateway in front of
//! this service verifies the caller and propagates the identity in
//! `x-user-*` headers, which the [`Identity`] extractor trusts. A request
//! without a complete identity is answered 401 before any handler runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::documents::{BlobStore, FileUpload};
use super::domain::{
    AttachmentId, AttachmentSlot, Identity, Registration, RegistrationId, RegistrationStatus,
    Role, UserId,
};
use super::ingest::RawSubmission;
use super::repository::{
    AttachmentRepository, Notifier, RegistrationQuery, RegistrationRepository,
};
use super::schema::FieldViolation;
use super::service::{DocumentMetadata, RegistrationService, ServiceError, StatusChange};

/// Router-level knobs supplied by the hosting binary.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Combined multipart body ceiling; declared oversize requests get 413.
    pub body_limit_bytes: usize,
    /// Expose internal error detail (development only).
    pub expose_error_detail: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            body_limit_bytes: 64 * 1024 * 1024,
            expose_error_detail: false,
        }
    }
}

pub(crate) struct RouterState<R, A, B, N> {
    service: Arc<RegistrationService<R, A, B, N>>,
    config: Arc<RouterConfig>,
}

impl<R, A, B, N> Clone for RouterState<R, A, B, N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            config: self.config.clone(),
        }
    }
}

/// Router builder exposing the registration and document endpoints.
pub fn registration_router<R, A, B, N>(
    service: Arc<RegistrationService<R, A, B, N>>,
    config: RouterConfig,
) -> Router
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    let body_limit = config.body_limit_bytes;
    let state = RouterState {
        service,
        config: Arc::new(config),
    };

    Router::new()
        .route(
            "/api/v1/registrations",
            post(submit_handler::<R, A, B, N>).get(list_handler::<R, A, B, N>),
        )
        .route(
            "/api/v1/registrations/:registration_id",
            get(get_handler::<R, A, B, N>),
        )
        .route(
            "/api/v1/registrations/:registration_id/status",
            patch(status_handler::<R, A, B, N>),
        )
        .route("/api/v1/documents", post(upload_document_handler::<R, A, B, N>))
        .route(
            "/api/v1/documents/batch",
            post(upload_documents_handler::<R, A, B, N>),
        )
        .route(
            "/api/v1/documents/:document_id",
            get(get_document_handler::<R, A, B, N>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(&parts.headers, "x-user-id");
        let email = header_value(&parts.headers, "x-user-email");
        let role = header_value(&parts.headers, "x-user-role")
            .as_deref()
            .and_then(Role::parse);

        match (user_id, email, role) {
            (Some(user_id), Some(email), Some(role)) => Ok(Identity {
                user_id: UserId(user_id),
                email,
                name: header_value(&parts.headers, "x-user-name"),
                role,
            }),
            _ => Err(unauthorized()),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Authentication required", "error": "UNAUTHORIZED" })),
    )
        .into_response()
}

pub(crate) async fn submit_handler<R, A, B, N>(
    State(state): State<RouterState<R, A, B, N>>,
    identity: Identity,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    if let Some(response) = reject_oversize_body(&headers, state.config.body_limit_bytes) {
        return response;
    }

    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(response) => return response,
    };

    match state.service.submit(&identity, submission) {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Registration submitted successfully",
                "data": record,
            })),
        )
            .into_response(),
        Err(err) => service_error_response(err, &state.config),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
}

pub(crate) async fn list_handler<R, A, B, N>(
    State(state): State<RouterState<R, A, B, N>>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(token) => match RegistrationStatus::parse(token) {
            Some(status) => Some(status),
            None => {
                return validation_response(vec![FieldViolation::new(
                    "status",
                    "is not a recognized registration status",
                )])
            }
        },
    };

    let query = RegistrationQuery {
        page: query.page.unwrap_or(1).max(1),
        per_page: query.limit.unwrap_or(10).max(1),
        status,
    };

    match state.service.list(&identity, query) {
        Ok(page) => (
            StatusCode::OK,
            Json(json!({
                "data": page.items,
                "pagination": {
                    "page": page.page,
                    "limit": page.per_page,
                    "total": page.total,
                    "totalPages": page.total_pages(),
                },
            })),
        )
            .into_response(),
        Err(err) => service_error_response(err, &state.config),
    }
}

pub(crate) async fn get_handler<R, A, B, N>(
    State(state): State<RouterState<R, A, B, N>>,
    identity: Identity,
    Path(registration_id): Path<String>,
) -> Response
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    let id = RegistrationId(registration_id);
    match state.service.get(&identity, &id) {
        Ok(record) => record_response(StatusCode::OK, record),
        Err(err) => service_error_response(err, &state.config),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    status: String,
    notes: Option<String>,
}

pub(crate) async fn status_handler<R, A, B, N>(
    State(state): State<RouterState<R, A, B, N>>,
    identity: Identity,
    Path(registration_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    let Some(status) = RegistrationStatus::parse(&request.status) else {
        return validation_response(vec![FieldViolation::new(
            "status",
            "is not a recognized registration status",
        )]);
    };

    let id = RegistrationId(registration_id);
    let change = StatusChange {
        status,
        notes: request.notes,
    };

    match state.service.transition(&identity, &id, change) {
        Ok(record) => record_response(StatusCode::OK, record),
        Err(err) => service_error_response(err, &state.config),
    }
}

pub(crate) async fn upload_document_handler<R, A, B, N>(
    State(state): State<RouterState<R, A, B, N>>,
    identity: Identity,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    if let Some(response) = reject_oversize_body(&headers, state.config.body_limit_bytes) {
        return response;
    }

    let (files, metadata) = match read_documents(multipart, "file").await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let Some(file) = files.into_iter().next() else {
        return validation_response(vec![FieldViolation::new("file", "is required")]);
    };

    match state.service.upload_document(&identity, file, metadata) {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "File uploaded successfully",
                "data": record,
            })),
        )
            .into_response(),
        Err(err) => service_error_response(err, &state.config),
    }
}

pub(crate) async fn upload_documents_handler<R, A, B, N>(
    State(state): State<RouterState<R, A, B, N>>,
    identity: Identity,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    if let Some(response) = reject_oversize_body(&headers, state.config.body_limit_bytes) {
        return response;
    }

    let (files, metadata) = match read_documents(multipart, "files").await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    match state.service.upload_documents(&identity, files, metadata) {
        Ok(records) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Files uploaded successfully",
                "data": records,
            })),
        )
            .into_response(),
        Err(err) => service_error_response(err, &state.config),
    }
}

pub(crate) async fn get_document_handler<R, A, B, N>(
    State(state): State<RouterState<R, A, B, N>>,
    identity: Identity,
    Path(document_id): Path<String>,
) -> Response
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    let id = AttachmentId(document_id);
    match state.service.get_document(&identity, &id) {
        Ok(record) => (StatusCode::OK, Json(json!({ "data": record }))).into_response(),
        Err(err) => service_error_response(err, &state.config),
    }
}

/// Decode a registration submission: text fields keep their wire strings,
/// recognized attachment slots become file parts, unknown file parts are
/// dropped.
async fn read_submission(mut multipart: Multipart) -> Result<RawSubmission, Response> {
    let mut fields = BTreeMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed_multipart)? {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(ToString::to_string);

        if let Some(file_name) = file_name {
            let Some(slot) = AttachmentSlot::parse(&name) else {
                continue;
            };
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(malformed_multipart)?;
            if bytes.is_empty() {
                continue;
            }
            files.push((
                slot,
                FileUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                },
            ));
        } else {
            let value = field.text().await.map_err(malformed_multipart)?;
            fields.insert(name, value);
        }
    }

    Ok(RawSubmission { fields, files })
}

/// Decode a standalone document upload: file parts under `file_field`,
/// everything else treated as metadata.
async fn read_documents(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<(Vec<FileUpload>, DocumentMetadata), Response> {
    let mut files = Vec::new();
    let mut metadata = DocumentMetadata::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed_multipart)? {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(ToString::to_string);

        if let Some(file_name) = file_name {
            if name != file_field {
                continue;
            }
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(malformed_multipart)?;
            files.push(FileUpload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(malformed_multipart)?;
            match name.as_str() {
                "documentType" => metadata.document_type = Some(value),
                "description" => metadata.description = Some(value),
                "registrationId" => {
                    if !value.trim().is_empty() {
                        metadata.registration_id = Some(RegistrationId(value.trim().to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    Ok((files, metadata))
}

fn reject_oversize_body(headers: &HeaderMap, limit: usize) -> Option<Response> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())?;

    if declared > limit {
        return Some(
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "message": "Combined upload size exceeds the configured limit",
                    "error": "PAYLOAD_TOO_LARGE",
                })),
            )
                .into_response(),
        );
    }

    None
}

fn malformed_multipart(err: axum::extract::multipart::MultipartError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "message": format!("Malformed multipart payload: {err}"),
            "error": "INVALID_PAYLOAD",
        })),
    )
        .into_response()
}

fn record_response(status: StatusCode, record: Registration) -> Response {
    (status, Json(json!({ "data": record }))).into_response()
}

fn validation_response(violations: Vec<FieldViolation>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "message": "Validation error",
            "errors": violations,
        })),
    )
        .into_response()
}

fn service_error_response(error: ServiceError, config: &RouterConfig) -> Response {
    match error {
        ServiceError::Validation(violations) => validation_response(violations),
        ServiceError::AlreadySubmitted => (
            StatusCode::CONFLICT,
            Json(json!({
                "message": "A registration has already been submitted for this account",
                "error": "ALREADY_SUBMITTED",
            })),
        )
            .into_response(),
        ServiceError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Record not found", "error": "NOT_FOUND" })),
        )
            .into_response(),
        ServiceError::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "message": "Not authorized to perform this operation",
                "error": "FORBIDDEN",
            })),
        )
            .into_response(),
        ServiceError::Storage(err) => internal_error_response(err.to_string(), config),
        ServiceError::Repository(detail) => internal_error_response(detail, config),
    }
}

fn internal_error_response(detail: String, config: &RouterConfig) -> Response {
    error!(%detail, "request failed on infrastructure error");
    let body = if config.expose_error_detail {
        json!({ "message": "Internal server error", "error": detail })
    } else {
        json!({ "message": "Internal server error", "error": "INTERNAL_SERVER_ERROR" })
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
