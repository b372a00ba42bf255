use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::documents::{
    extension_of, BlobStore, BlobStoreError, DocumentIntake, DocumentIntakeError, DocumentPolicy,
    FileUpload,
};
use super::domain::{
    Attachment, AttachmentId, DocumentKind, Identity, Registration, RegistrationId,
    RegistrationStatus, MAX_NOTES_LEN,
};
use super::ingest::{RawSubmission, RegistrationInput};
use super::repository::{
    AttachmentRepository, Notification, Notifier, RegistrationPage, RegistrationQuery,
    RegistrationRepository, RepositoryError,
};
use super::schema::FieldViolation;

/// Service composing the ingestion gate, document intake, repositories,
/// and the notification hook.
pub struct RegistrationService<R, A, B, N> {
    registrations: Arc<R>,
    attachments: Arc<A>,
    intake: DocumentIntake<B>,
    notifier: Arc<N>,
}

static REGISTRATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ATTACHMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_registration_id() -> RegistrationId {
    let id = REGISTRATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RegistrationId(format!("reg-{id:06}"))
}

fn next_attachment_id() -> AttachmentId {
    let id = ATTACHMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AttachmentId(format!("doc-{id:06}"))
}

/// Admin-requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: RegistrationStatus,
    pub notes: Option<String>,
}

/// Metadata accompanying a standalone document upload.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub document_type: Option<String>,
    pub description: Option<String>,
    pub registration_id: Option<RegistrationId>,
}

impl<R, A, B, N> RegistrationService<R, A, B, N>
where
    R: RegistrationRepository + 'static,
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        registrations: Arc<R>,
        attachments: Arc<A>,
        blobs: Arc<B>,
        notifier: Arc<N>,
        policy: DocumentPolicy,
    ) -> Self {
        Self {
            registrations,
            attachments,
            intake: DocumentIntake::new(blobs, policy),
            notifier,
        }
    }

    pub fn policy(&self) -> &DocumentPolicy {
        self.intake.policy()
    }

    /// Validate and persist a new registration.
    ///
    /// All provided attachments are stored before the record is created;
    /// if any one fails, no record is written. The insert's unique-owner
    /// constraint is the authoritative duplicate signal; the earlier
    /// `fetch_by_user` check only keeps duplicate submissions from
    /// uploading files first.
    pub fn submit(
        &self,
        identity: &Identity,
        submission: RawSubmission,
    ) -> Result<Registration, ServiceError> {
        let input =
            RegistrationInput::from_raw(&submission).map_err(ServiceError::Validation)?;

        if self.registrations.fetch_by_user(&identity.user_id)?.is_some() {
            return Err(ServiceError::AlreadySubmitted);
        }

        let documents = self
            .intake
            .stage_registration_files(&identity.user_id, &submission.files)?;

        let now = Utc::now();
        let record = input.into_registration(
            next_registration_id(),
            identity.user_id.clone(),
            documents,
            now,
        );

        let stored = match self.registrations.insert(record) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                // Lost the race to a concurrent submission; the files
                // stored above are orphaned.
                warn!(user = %identity.user_id.0, "duplicate registration insert; uploads orphaned");
                return Err(ServiceError::AlreadySubmitted);
            }
            Err(other) => return Err(other.into()),
        };

        self.dispatch(confirmation_notification(&stored));
        Ok(stored)
    }

    /// Apply an admin status change.
    ///
    /// Requesting the currently-held status is acknowledged without
    /// stamping attribution or sending a notification, so redundant admin
    /// clicks never produce duplicate e-mails. Any status may follow any
    /// other; concurrent admins resolve last-write-wins.
    pub fn transition(
        &self,
        identity: &Identity,
        id: &RegistrationId,
        change: StatusChange,
    ) -> Result<Registration, ServiceError> {
        if !identity.is_admin() {
            return Err(ServiceError::Forbidden);
        }

        if let Some(notes) = &change.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                return Err(ServiceError::Validation(vec![FieldViolation::new(
                    "notes",
                    format!("must be at most {MAX_NOTES_LEN} characters"),
                )]));
            }
        }

        let mut record = self
            .registrations
            .fetch(id)?
            .ok_or(ServiceError::NotFound)?;

        if record.status == change.status {
            return Ok(record);
        }

        let now = Utc::now();
        record.status = change.status;
        record.status_updated_at = Some(now);
        record.status_updated_by = Some(identity.user_id.clone());
        record.updated_at = now;
        if let Some(notes) = change.notes {
            record.notes = Some(notes);
        }

        self.registrations.update(record.clone())?;
        self.dispatch(status_notification(&record, identity));
        Ok(record)
    }

    /// Fetch one registration; owners see their own, admins see any.
    pub fn get(
        &self,
        identity: &Identity,
        id: &RegistrationId,
    ) -> Result<Registration, ServiceError> {
        let record = self
            .registrations
            .fetch(id)?
            .ok_or(ServiceError::NotFound)?;

        if !identity.is_admin() && record.user_id != identity.user_id {
            return Err(ServiceError::Forbidden);
        }

        Ok(record)
    }

    /// Admin-only paginated listing, optionally filtered by status.
    pub fn list(
        &self,
        identity: &Identity,
        query: RegistrationQuery,
    ) -> Result<RegistrationPage, ServiceError> {
        if !identity.is_admin() {
            return Err(ServiceError::Forbidden);
        }

        Ok(self.registrations.list(&query)?)
    }

    /// Store one standalone document and record it.
    pub fn upload_document(
        &self,
        identity: &Identity,
        file: FileUpload,
        metadata: DocumentMetadata,
    ) -> Result<Attachment, ServiceError> {
        if let Some(registration_id) = &metadata.registration_id {
            let registration = self
                .registrations
                .fetch(registration_id)?
                .ok_or(ServiceError::NotFound)?;
            if !identity.is_admin() && registration.user_id != identity.user_id {
                return Err(ServiceError::Forbidden);
            }
        }

        let id = next_attachment_id();
        let key = format!("uploads/{}{}", id.0, extension_of(&file.file_name));
        let url = self.intake.store_document(&key, &file)?;

        let record = Attachment {
            id,
            user_id: identity.user_id.clone(),
            registration_id: metadata.registration_id,
            file_name: file.file_name,
            file_type: file.content_type,
            file_size: file.bytes.len(),
            file_url: url,
            document_type: DocumentKind::parse(metadata.document_type.as_deref().unwrap_or("")),
            description: metadata.description,
            uploaded_at: Utc::now(),
        };

        Ok(self.attachments.insert(record)?)
    }

    /// Store a batch of standalone documents under shared metadata.
    ///
    /// Constraints are checked for the whole batch before the first byte
    /// is stored.
    pub fn upload_documents(
        &self,
        identity: &Identity,
        files: Vec<FileUpload>,
        metadata: DocumentMetadata,
    ) -> Result<Vec<Attachment>, ServiceError> {
        if files.is_empty() {
            return Err(ServiceError::Validation(vec![FieldViolation::new(
                "files",
                "at least one file is required",
            )]));
        }
        let max = self.intake.policy().max_batch_files;
        if files.len() > max {
            return Err(ServiceError::Validation(vec![FieldViolation::new(
                "files",
                format!("no more than {max} files per batch"),
            )]));
        }
        for file in &files {
            self.intake
                .policy()
                .check(file, self.intake.policy().document_file_limit_bytes)
                .map_err(|message| {
                    ServiceError::Validation(vec![FieldViolation::new("files", message)])
                })?;
        }

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            stored.push(self.upload_document(identity, file, metadata.clone())?);
        }
        Ok(stored)
    }

    /// Fetch one document record; owners see their own, admins see any.
    pub fn get_document(
        &self,
        identity: &Identity,
        id: &AttachmentId,
    ) -> Result<Attachment, ServiceError> {
        let record = self.attachments.fetch(id)?.ok_or(ServiceError::NotFound)?;

        if !identity.is_admin() && record.user_id != identity.user_id {
            return Err(ServiceError::Forbidden);
        }

        Ok(record)
    }

    // The triggering operation has already committed; a failed send is
    // logged and swallowed.
    fn dispatch(&self, notification: Notification) {
        if let Err(err) = self.notifier.send(notification) {
            warn!(error = %err, "notification dispatch failed");
        }
    }
}

fn confirmation_notification(record: &Registration) -> Notification {
    let mut details = BTreeMap::new();
    details.insert("registrationId".to_string(), record.id.0.clone());
    details.insert("firstName".to_string(), record.first_name.clone());
    details.insert("status".to_string(), record.status.label().to_string());

    Notification {
        template: "registration_received".to_string(),
        recipient: record.email.clone(),
        subject: "Registration submitted successfully".to_string(),
        details,
    }
}

fn status_notification(record: &Registration, actor: &Identity) -> Notification {
    let mut details = BTreeMap::new();
    details.insert("registrationId".to_string(), record.id.0.clone());
    details.insert("status".to_string(), record.status.label().to_string());
    details.insert("updatedBy".to_string(), actor.user_id.0.clone());
    if let Some(notes) = &record.notes {
        details.insert("notes".to_string(), notes.clone());
    }

    Notification {
        template: "registration_status_updated".to_string(),
        recipient: record.email.clone(),
        subject: "Registration status updated".to_string(),
        details,
    }
}

/// Error raised by the registration service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("submission failed validation")]
    Validation(Vec<FieldViolation>),
    #[error("a registration has already been submitted for this account")]
    AlreadySubmitted,
    #[error("record not found")]
    NotFound,
    #[error("caller is not permitted to perform this operation")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] BlobStoreError),
    #[error("repository unavailable: {0}")]
    Repository(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => ServiceError::AlreadySubmitted,
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::Unavailable(detail) => ServiceError::Repository(detail),
        }
    }
}

impl From<DocumentIntakeError> for ServiceError {
    fn from(value: DocumentIntakeError) -> Self {
        match value {
            DocumentIntakeError::Rejected { field, message } => {
                ServiceError::Validation(vec![FieldViolation::new(field, message)])
            }
            DocumentIntakeError::Storage(err) => ServiceError::Storage(err),
        }
    }
}
