use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    Attachment, AttachmentId, Registration, RegistrationId, RegistrationStatus, UserId,
};

/// Storage abstraction for registrations so the service module can be
/// exercised in isolation.
///
/// `insert` is the authority on the one-registration-per-user invariant:
/// implementations must enforce the unique-owner constraint atomically and
/// answer `Conflict` for a duplicate, never overwrite.
pub trait RegistrationRepository: Send + Sync {
    fn insert(&self, record: Registration) -> Result<Registration, RepositoryError>;
    fn update(&self, record: Registration) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError>;
    fn fetch_by_user(&self, user: &UserId) -> Result<Option<Registration>, RepositoryError>;
    fn list(&self, query: &RegistrationQuery) -> Result<RegistrationPage, RepositoryError>;
}

/// Storage abstraction for standalone document records.
pub trait AttachmentRepository: Send + Sync {
    fn insert(&self, record: Attachment) -> Result<Attachment, RepositoryError>;
    fn fetch(&self, id: &AttachmentId) -> Result<Option<Attachment>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Filtered, paginated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationQuery {
    pub page: u32,
    pub per_page: u32,
    pub status: Option<RegistrationStatus>,
}

impl Default for RegistrationQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            status: None,
        }
    }
}

/// One page of registrations, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationPage {
    pub items: Vec<Registration>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl RegistrationPage {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page as u64)
    }
}

/// Outbound notification hook (e-mail adapters and the like). Delivery is
/// best-effort; callers log failures and move on.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Templated notification payload so routes and tests can assert the
/// integration boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipient: String,
    pub subject: String,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
