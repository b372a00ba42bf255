//! Registration intake, review, and document handling.
//!
//! The client-facing half is the field schema registry and the multi-step
//! form controller; the server-facing half is the coercion/ingestion gate,
//! document intake, the repository-backed store, and the status review
//! workflow, all exposed over the axum router.

pub mod coerce;
pub mod documents;
pub mod domain;
pub mod draft;
pub mod ingest;
pub mod repository;
pub mod router;
pub mod schema;
pub mod service;

#[cfg(test)]
mod tests;

pub use documents::{
    BlobStore, BlobStoreError, DocumentIntake, DocumentIntakeError, DocumentPolicy, FileUpload,
};
pub use domain::{
    Attachment, AttachmentId, AttachmentSlot, DocumentKind, Gender, Identity, JobType,
    MaritalStatus, NoticePeriodUnit, ProcessingUrgency, Reference, Registration, RegistrationId,
    RegistrationStatus, Role, UserId, VisaType, MAX_NOTES_LEN,
};
pub use draft::{RegistrationForm, SubmissionPayload, SubmitBlocked};
pub use ingest::{RawSubmission, RegistrationInput};
pub use repository::{
    AttachmentRepository, Notification, Notifier, NotifyError, RegistrationPage,
    RegistrationQuery, RegistrationRepository, RepositoryError,
};
pub use router::{registration_router, RouterConfig};
pub use schema::{FieldMap, FieldRule, FieldSpec, FieldValue, FieldViolation, FormStep};
pub use service::{DocumentMetadata, RegistrationService, ServiceError, StatusChange};
