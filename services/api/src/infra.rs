use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use medreg::config::UploadConfig;
use medreg::registration::{
    Attachment, AttachmentId, AttachmentRepository, BlobStore, BlobStoreError, DocumentPolicy,
    Notification, Notifier, NotifyError, Registration, RegistrationId, RegistrationPage,
    RegistrationQuery, RegistrationRepository, RepositoryError, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn document_policy(uploads: &UploadConfig) -> DocumentPolicy {
    DocumentPolicy {
        form_file_limit_bytes: uploads.form_file_limit_bytes,
        document_file_limit_bytes: uploads.document_file_limit_bytes,
        max_batch_files: uploads.max_batch_files,
    }
}

/// Process-local registration store. A relational backend slots in behind
/// the same trait; the unique-owner rule lives in `insert` either way.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRegistrationRepository {
    records: Arc<Mutex<HashMap<RegistrationId, Registration>>>,
}

impl RegistrationRepository for InMemoryRegistrationRepository {
    fn insert(&self, record: Registration) -> Result<Registration, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_user(&self, user: &UserId) -> Result<Option<Registration>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| &record.user_id == user)
            .cloned())
    }

    fn list(&self, query: &RegistrationQuery) -> Result<RegistrationPage, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryAttachmentRepository {
    records: Arc<Mutex<HashMap<AttachmentId, Attachment>>>,
}

impl AttachmentRepository for InMemoryAttachmentRepository {
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

/// Process-local blob store; an S3-compatible adapter replaces this in a
/// real deployment.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBlobStore {
    objects: Arc<Mutex<HashMap<String, (String, usize)>>>,
}

impl BlobStore for InMemoryBlobStore {
    fn store(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<String, BlobStoreError> {
        self.objects
            .lock()
            .expect("blob mutex poisoned")
            .insert(key.to_string(), (content_type.to_string(), bytes.len()));
        Ok(format!("memory://{key}"))
    }
}

/// Default notifier: e-mail delivery is an external collaborator, so the
/// adapter records the payload and logs it.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl LoggingNotifier {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for LoggingNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            "notification dispatched"
        );
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}
