use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::registration::documents::{BlobStore, BlobStoreError, DocumentPolicy, FileUpload};
use crate::registration::domain::{
    Attachment, AttachmentId, Identity, Registration, RegistrationId, Role, UserId,
};
use crate::registration::draft::RegistrationForm;
use crate::registration::ingest::RawSubmission;
use crate::registration::repository::{
    AttachmentRepository, Notification, Notifier, NotifyError, RegistrationPage,
    RegistrationQuery, RegistrationRepository, RepositoryError,
};
use crate::registration::router::{registration_router, RouterConfig};
use crate::registration::schema::FieldValue;
use crate::registration::service::RegistrationService;
use crate::registration::AttachmentSlot;

pub(super) fn applicant() -> Identity {
    Identity {
        user_id: UserId("user-1".to_string()),
        email: "amina.haile@example.com".to_string(),
        name: Some("Amina Haile".to_string()),
        role: Role::Applicant,
    }
}

pub(super) fn other_applicant() -> Identity {
    Identity {
        user_id: UserId("user-2".to_string()),
        email: "tesfaye.girma@example.com".to_string(),
        name: None,
        role: Role::Applicant,
    }
}

pub(super) fn admin() -> Identity {
    Identity {
        user_id: UserId("admin-1".to_string()),
        email: "ops@example.com".to_string(),
        name: Some("Operations".to_string()),
        role: Role::Admin,
    }
}

/// Complete, valid wire payload as the multipart transport delivers it.
pub(super) fn wire_fields() -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut put = |name: &str, value: &str| {
        fields.insert(name.to_string(), value.to_string());
    };

    put("firstName", "Amina");
    put("lastName", "Haile");
    put("dateOfBirth", "1990-04-12");
    put("gender", "FEMALE");
    put("maritalStatus", "SINGLE");
    put("email", "amina.haile@example.com");
    put("phoneNumber", "+971 50 123 4567");
    put("currentLocation", "Addis Ababa");
    put("country", "Ethiopia");
    put("city", "Addis Ababa");
    put("address", "Bole Road 12");
    put("postalCode", "1000");
    put("emergencyContactName", "Salem Haile");
    put("emergencyContactPhone", "+251 911 234 567");

    put("profession", "Registered Nurse");
    put("specialization", "Pediatrics");
    put("yearsOfExperience", "5-10");
    put("currentEmployer", "St. Paul Hospital");
    put("jobTitle", "Senior Nurse");
    put("hasProfessionalLicense", "true");
    put("licenseType", "Nursing");
    put("licenseNumber", "RN-5521");
    put("issuingOrganization", "Ethiopian Ministry of Health");
    put("licenseExpiryDate", "2027-01-31");
    put("licensingStatus", "Active");

    put("preferredLocations", r#"["Dubai","Riyadh"]"#);
    put("willingToRelocate", "true");
    put("preferredJobTypes", r#"["full_time","contract"]"#);
    put("expectedSalary", "5000");
    put("noticePeriodValue", "30");
    put("noticePeriodUnit", "days");
    // Lowercase on purpose; ingestion normalizes enum casing.
    put("visaType", "employment");
    put("processingUrgency", "STANDARD");

    put(
        "references",
        r#"[{"name":"Dr. Lensa Bekele","position":"Head of Nursing","company":"St. Paul Hospital","email":"lensa.bekele@example.com","phone":"+251 911 000 111"}]"#,
    );
    put("confirmAccuracy", "true");
    put("termsAccepted", "true");
    put("backgroundCheckConsent", "true");

    fields
}

pub(super) fn raw_submission() -> RawSubmission {
    RawSubmission {
        fields: wire_fields(),
        files: Vec::new(),
    }
}

pub(super) fn pdf_upload(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4 test".to_vec(),
    }
}

pub(super) fn birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 4, 12).expect("valid date")
}

pub(super) fn fill_personal(form: &mut RegistrationForm) {
    form.set("firstName", FieldValue::Text("Amina".to_string()));
    form.set("lastName", FieldValue::Text("Haile".to_string()));
    form.set("dateOfBirth", FieldValue::Date(birth_date()));
    form.set("gender", FieldValue::Text("FEMALE".to_string()));
    form.set("maritalStatus", FieldValue::Text("SINGLE".to_string()));
    form.set(
        "email",
        FieldValue::Text("amina.haile@example.com".to_string()),
    );
    form.set("phoneNumber", FieldValue::Text("+971 50 123 4567".to_string()));
    form.set("currentLocation", FieldValue::Text("Addis Ababa".to_string()));
    form.set("country", FieldValue::Text("Ethiopia".to_string()));
    form.set("city", FieldValue::Text("Addis Ababa".to_string()));
    form.set("address", FieldValue::Text("Bole Road 12".to_string()));
    form.set("postalCode", FieldValue::Text("1000".to_string()));
    form.set(
        "emergencyContactName",
        FieldValue::Text("Salem Haile".to_string()),
    );
    form.set(
        "emergencyContactPhone",
        FieldValue::Text("+251 911 234 567".to_string()),
    );
}

pub(super) fn fill_professional(form: &mut RegistrationForm) {
    form.set("profession", FieldValue::Text("Registered Nurse".to_string()));
    form.set("yearsOfExperience", FieldValue::Text("5-10".to_string()));
    form.set("jobTitle", FieldValue::Text("Senior Nurse".to_string()));
    form.set("hasProfessionalLicense", FieldValue::Flag(true));
    form.set("licenseNumber", FieldValue::Text("RN-5521".to_string()));
}

pub(super) fn fill_preferences(form: &mut RegistrationForm) {
    form.set(
        "preferredLocations",
        FieldValue::TextList(vec!["Dubai".to_string(), "Riyadh".to_string()]),
    );
    form.set("willingToRelocate", FieldValue::Flag(true));
    form.set(
        "preferredJobTypes",
        FieldValue::TextList(vec!["full_time".to_string()]),
    );
    form.set("expectedSalary", FieldValue::Number(5000.0));
    form.set("noticePeriodValue", FieldValue::Number(30.0));
    form.set("noticePeriodUnit", FieldValue::Text("days".to_string()));
}

pub(super) fn fill_documents(form: &mut RegistrationForm) {
    form.set(
        "references",
        FieldValue::References(vec![crate::registration::Reference {
            name: "Dr. Lensa Bekele".to_string(),
            position: "Head of Nursing".to_string(),
            company: "St. Paul Hospital".to_string(),
            email: "lensa.bekele@example.com".to_string(),
            phone: "+251 911 000 111".to_string(),
        }]),
    );
    form.set("confirmAccuracy", FieldValue::Flag(true));
    form.set("termsAccepted", FieldValue::Flag(true));
    form.set("backgroundCheckConsent", FieldValue::Flag(true));
}

#[derive(Default)]
pub(super) struct MemoryRegistrations {
    records: Mutex<HashMap<RegistrationId, Registration>>,
}

impl MemoryRegistrations {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("registration mutex poisoned").len()
    }

    pub(super) fn count_for_user(&self, user: &UserId) -> usize {
        self.records
            .lock()
            .expect("registration mutex poisoned")
            .values()
            .filter(|record| &record.user_id == user)
            .count()
    }
}

impl RegistrationRepository for MemoryRegistrations {
    fn insert(&self, record: Registration) -> Result<Registration, RepositoryError> {
        let mut guard = self.records.lock().expect("registration mutex poisoned");
        let duplicate = guard
            .values()
            .any(|existing| existing.user_id == record.user_id)
            || guard.contains_key(&record.id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: Registration) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("registration mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        let guard = self.records.lock().expect("registration mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_user(&self, user: &UserId) -> Result<Option<Registration>, RepositoryError> {
        let guard = self.records.lock().expect("registration mutex poisoned");
        Ok(guard
            .values()
            .find(|record| &record.user_id == user)
            .cloned())
    }

    fn list(&self, query: &RegistrationQuery) -> Result<RegistrationPage, RepositoryError> {
        let guard = self.records.lock().expect("registration mutex poisoned");
        let mut items: Vec<Registration> = guard
            .values()
            .filter(|record| {
                query
                    .status
                    .map(|status| record.status == status)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = items.len() as u64;
        let offset = (query.page.saturating_sub(1) * query.per_page) as usize;
        let items = items
            .into_iter()
            .skip(offset)
            .take(query.per_page as usize)
            .collect();

        Ok(RegistrationPage {
            items,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryAttachments {
    records: Mutex<HashMap<AttachmentId, Attachment>>,
}

impl AttachmentRepository for MemoryAttachments {
    fn insert(&self, record: Attachment) -> Result<Attachment, RepositoryError> {
        let mut guard = self.records.lock().expect("attachment mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &AttachmentId) -> Result<Option<Attachment>, RepositoryError> {
        let guard = self.records.lock().expect("attachment mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Blob store fake; can be told to fail for keys containing a marker.
#[derive(Default)]
pub(super) struct MemoryBlobs {
    stored: Mutex<Vec<(String, String, usize)>>,
    fail_on: Option<String>,
}

impl MemoryBlobs {
    pub(super) fn failing_on(marker: &str) -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            fail_on: Some(marker.to_string()),
        }
    }

    pub(super) fn stored(&self) -> Vec<(String, String, usize)> {
        self.stored.lock().expect("blob mutex poisoned").clone()
    }
}

impl BlobStore for MemoryBlobs {
    fn store(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<String, BlobStoreError> {
        if let Some(marker) = &self.fail_on {
            if key.contains(marker.as_str()) {
                return Err(BlobStoreError::Unavailable("simulated outage".to_string()));
            }
        }
        self.stored
            .lock()
            .expect("blob mutex poisoned")
            .push((key.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("memory://{key}"))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// Repository stub whose reads always fail, for authorization-ordering
/// assertions.
pub(super) struct UnavailableRegistrations;

impl RegistrationRepository for UnavailableRegistrations {
    fn insert(&self, _record: Registration) -> Result<Registration, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: Registration) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_by_user(&self, _user: &UserId) -> Result<Option<Registration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _query: &RegistrationQuery) -> Result<RegistrationPage, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) type TestService =
    RegistrationService<MemoryRegistrations, MemoryAttachments, MemoryBlobs, MemoryNotifier>;

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryRegistrations>,
    Arc<MemoryAttachments>,
    Arc<MemoryBlobs>,
    Arc<MemoryNotifier>,
) {
    build_service_with_blobs(MemoryBlobs::default())
}

pub(super) fn build_service_with_blobs(
    blobs: MemoryBlobs,
) -> (
    Arc<TestService>,
    Arc<MemoryRegistrations>,
    Arc<MemoryAttachments>,
    Arc<MemoryBlobs>,
    Arc<MemoryNotifier>,
) {
    let registrations = Arc::new(MemoryRegistrations::default());
    let attachments = Arc::new(MemoryAttachments::default());
    let blobs = Arc::new(blobs);
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(RegistrationService::new(
        registrations.clone(),
        attachments.clone(),
        blobs.clone(),
        notifier.clone(),
        DocumentPolicy::default(),
    ));
    (service, registrations, attachments, blobs, notifier)
}

pub(super) fn test_router(service: Arc<TestService>) -> axum::Router {
    registration_router(
        service,
        RouterConfig {
            body_limit_bytes: 32 * 1024 * 1024,
            expose_error_detail: true,
        },
    )
}

pub(super) const BOUNDARY: &str = "----medreg-test-boundary";

/// Assemble a multipart/form-data body from text fields and file parts.
pub(super) fn multipart_body(
    fields: &BTreeMap<String, String>,
    files: &[(AttachmentSlot, FileUpload)],
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (slot, file) in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                slot.field_name(),
                file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(&file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn with_identity(
    builder: axum::http::request::Builder,
    identity: &Identity,
) -> axum::http::request::Builder {
    let role = match identity.role {
        Role::Admin => "ADMIN",
        Role::Applicant => "APPLICANT",
    };
    builder
        .header("x-user-id", identity.user_id.0.clone())
        .header("x-user-email", identity.email.clone())
        .header("x-user-role", role)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
