use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::registration::domain::{AttachmentSlot, Identity};
use crate::registration::repository::RegistrationRepository;

fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

fn submit_request(identity: &Identity, body: Vec<u8>) -> Request<Body> {
    with_identity(Request::post("/api/v1/registrations"), identity)
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn requests_without_identity_headers_are_unauthorized() {
    let (service, _, _, _, _) = build_service();
    let router = test_router(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/registrations")
                .header(header::CONTENT_TYPE, multipart_content_type())
                .body(Body::from(multipart_body(&wire_fields(), &[])))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("error"), Some(&json!("UNAUTHORIZED")));
}

#[tokio::test]
async fn submit_route_creates_a_registration() {
    let (service, _, _, _, notifier) = build_service();
    let router = test_router(service);

    let body = multipart_body(
        &wire_fields(),
        &[(AttachmentSlot::Resume, pdf_upload("cv.pdf"))],
    );
    let response = router
        .oneshot(submit_request(&applicant(), body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let data = payload.get("data").expect("record payload");
    assert_eq!(data.get("status"), Some(&json!("SUBMITTED")));
    assert_eq!(data.get("statusUpdatedAt"), Some(&Value::Null));
    assert!(data
        .get("documents")
        .and_then(|documents| documents.get("resume"))
        .is_some());
    assert_eq!(notifier.events().len(), 1);
}

#[tokio::test]
async fn submit_route_reports_field_violations() {
    let (service, registrations, _, _, _) = build_service();
    let router = test_router(service);

    let mut fields = wire_fields();
    fields.remove("email");
    let response = router
        .oneshot(submit_request(&applicant(), multipart_body(&fields, &[])))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    let errors = payload
        .get("errors")
        .and_then(Value::as_array)
        .expect("structured error list");
    assert!(errors
        .iter()
        .any(|error| error.get("field") == Some(&json!("email"))));
    assert_eq!(registrations.len(), 0);
}

#[tokio::test]
async fn duplicate_submission_maps_to_conflict() {
    let (service, _, _, _, _) = build_service();
    let router = test_router(service);

    let first = router
        .clone()
        .oneshot(submit_request(&applicant(), multipart_body(&wire_fields(), &[])))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = router
        .oneshot(submit_request(&applicant(), multipart_body(&wire_fields(), &[])))
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let payload = read_json_body(second).await;
    assert_eq!(payload.get("error"), Some(&json!("ALREADY_SUBMITTED")));
}

#[tokio::test]
async fn declared_oversize_bodies_get_payload_too_large() {
    let (service, _, _, _, _) = build_service();
    let router = test_router(service);

    let response = router
        .oneshot(
            with_identity(Request::post("/api/v1/registrations"), &applicant())
                .header(header::CONTENT_TYPE, multipart_content_type())
                .header(header::CONTENT_LENGTH, (33 * 1024 * 1024).to_string())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn status_route_applies_admin_transitions() {
    let (service, _, _, _, notifier) = build_service();
    let record = service
        .submit(&applicant(), raw_submission())
        .expect("submission succeeds");
    let router = test_router(service);

    let response = router
        .oneshot(
            with_identity(
                Request::patch(format!("/api/v1/registrations/{}/status", record.id.0)),
                &admin(),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "status": "UNDER_REVIEW", "notes": "scheduling call" }).to_string(),
            ))
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let data = payload.get("data").expect("record payload");
    assert_eq!(data.get("status"), Some(&json!("UNDER_REVIEW")));
    assert_eq!(data.get("statusUpdatedBy"), Some(&json!("admin-1")));
    assert_eq!(data.get("notes"), Some(&json!("scheduling call")));
    assert_eq!(notifier.events().len(), 2);
}

#[tokio::test]
async fn status_route_refuses_non_admin_callers() {
    let (service, registrations, _, _, notifier) = build_service();
    let record = service
        .submit(&applicant(), raw_submission())
        .expect("submission succeeds");
    let router = test_router(service);

    let response = router
        .oneshot(
            with_identity(
                Request::patch(format!("/api/v1/registrations/{}/status", record.id.0)),
                &applicant(),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "status": "APPROVED" }).to_string()))
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let stored = registrations
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored, record, "record unchanged");
    assert_eq!(notifier.events().len(), 1, "no status notification");
}

#[tokio::test]
async fn status_route_rejects_unknown_status_tokens() {
    let (service, _, _, _, _) = build_service();
    let record = service
        .submit(&applicant(), raw_submission())
        .expect("submission succeeds");
    let router = test_router(service);

    let response = router
        .oneshot(
            with_identity(
                Request::patch(format!("/api/v1/registrations/{}/status", record.id.0)),
                &admin(),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "status": "ARCHIVED" }).to_string()))
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| errors
            .iter()
            .any(|error| error.get("field") == Some(&json!("status"))))
        .unwrap_or(false));
}

#[tokio::test]
async fn status_route_returns_not_found_for_unknown_ids() {
    let (service, _, _, _, _) = build_service();
    let router = test_router(service);

    let response = router
        .oneshot(
            with_identity(
                Request::patch("/api/v1/registrations/reg-999999/status"),
                &admin(),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "status": "APPROVED" }).to_string()))
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn single_record_reads_are_owner_or_admin_gated() {
    let (service, _, _, _, _) = build_service();
    let record = service
        .submit(&applicant(), raw_submission())
        .expect("submission succeeds");
    let router = test_router(service);

    let path = format!("/api/v1/registrations/{}", record.id.0);

    let owner_view = router
        .clone()
        .oneshot(
            with_identity(Request::get(&path), &applicant())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(owner_view.status(), StatusCode::OK);

    let stranger_view = router
        .clone()
        .oneshot(
            with_identity(Request::get(&path), &other_applicant())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(stranger_view.status(), StatusCode::FORBIDDEN);

    let admin_view = router
        .oneshot(
            with_identity(Request::get(&path), &admin())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(admin_view.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_is_paginated_and_admin_only() {
    let (service, _, _, _, _) = build_service();
    service
        .submit(&applicant(), raw_submission())
        .expect("submission succeeds");
    let router = test_router(service);

    let forbidden = router
        .clone()
        .oneshot(
            with_identity(Request::get("/api/v1/registrations"), &applicant())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(
            with_identity(
                Request::get("/api/v1/registrations?page=1&limit=10&status=SUBMITTED"),
                &admin(),
            )
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload
            .get("pagination")
            .and_then(|pagination| pagination.get("total")),
        Some(&json!(1))
    );
    assert_eq!(
        payload
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn document_upload_route_records_the_file() {
    let (service, _, _, _, _) = build_service();
    let router = test_router(service);

    let file = pdf_upload("license.pdf");
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"documentType\"\r\n\r\nLICENSE\r\n",
    );
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            file.file_name, file.content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(&file.bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let response = router
        .oneshot(
            with_identity(Request::post("/api/v1/documents"), &applicant())
                .header(header::CONTENT_TYPE, multipart_content_type())
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let data = payload.get("data").expect("attachment payload");
    assert_eq!(data.get("fileName"), Some(&json!("license.pdf")));
    assert_eq!(data.get("documentType"), Some(&json!("LICENSE")));
}
