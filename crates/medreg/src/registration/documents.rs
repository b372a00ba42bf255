//! Movement of uploaded files into durable blob storage.
//!
//! Constraints (allow-listed content types, per-file ceilings) are checked
//! for every file before any byte is handed to the store, so a rejected
//! batch never leaves partial state behind. A storage failure mid-batch
//! aborts the whole intake before any database write; keys that were
//! already stored are logged as orphans rather than silently leaked.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{AttachmentSlot, UserId};

/// Raw bytes of one uploaded file plus its transport metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Storage abstraction so intake can be exercised without a live object store.
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under `key`, returning a durable URL.
    fn store(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<String, BlobStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}

/// Error raised while moving files into storage.
#[derive(Debug, thiserror::Error)]
pub enum DocumentIntakeError {
    #[error("document '{field}' rejected: {message}")]
    Rejected { field: String, message: String },
    #[error(transparent)]
    Storage(#[from] BlobStoreError),
}

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// Ceilings applied during intake, derived from `UploadConfig`.
#[derive(Debug, Clone)]
pub struct DocumentPolicy {
    pub form_file_limit_bytes: usize,
    pub document_file_limit_bytes: usize,
    pub max_batch_files: usize,
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            form_file_limit_bytes: 5 * 1024 * 1024,
            document_file_limit_bytes: 10 * 1024 * 1024,
            max_batch_files: 5,
        }
    }
}

impl DocumentPolicy {
    /// Check one file against the allow-list and the given ceiling.
    pub fn check(&self, file: &FileUpload, limit_bytes: usize) -> Result<(), String> {
        let parsed: mime::Mime = file
            .content_type
            .parse()
            .map_err(|_| format!("unrecognized content type '{}'", file.content_type))?;

        let essence = parsed.essence_str();
        if !ALLOWED_CONTENT_TYPES.contains(&essence) {
            return Err(format!(
                "content type '{essence}' is not allowed (PDF, JPEG, PNG, DOC, DOCX, XLS, XLSX)"
            ));
        }

        if file.size() > limit_bytes {
            return Err(format!(
                "file exceeds the {} byte limit",
                limit_bytes
            ));
        }

        Ok(())
    }
}

/// Streams recognized attachment slots to the blob store ahead of record
/// creation.
pub struct DocumentIntake<B> {
    store: Arc<B>,
    policy: DocumentPolicy,
}

impl<B> DocumentIntake<B>
where
    B: BlobStore,
{
    pub fn new(store: Arc<B>, policy: DocumentPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &DocumentPolicy {
        &self.policy
    }

    /// Store every provided registration attachment, all or nothing.
    ///
    /// Absent slots are simply omitted. Every file is checked against the
    /// policy before the first byte is stored.
    pub fn stage_registration_files(
        &self,
        owner: &UserId,
        files: &[(AttachmentSlot, FileUpload)],
    ) -> Result<BTreeMap<AttachmentSlot, String>, DocumentIntakeError> {
        for (slot, file) in files {
            self.policy
                .check(file, self.policy.form_file_limit_bytes)
                .map_err(|message| DocumentIntakeError::Rejected {
                    field: slot.field_name().to_string(),
                    message,
                })?;
        }

        let mut stored = BTreeMap::new();
        for (slot, file) in files {
            let key = format!(
                "uploads/{}-{}{}",
                owner.0,
                slot.field_name(),
                extension_of(&file.file_name)
            );
            match self.store.store(&key, &file.content_type, &file.bytes) {
                // Later slots with the same name overwrite earlier ones.
                Ok(url) => {
                    stored.insert(*slot, url);
                }
                Err(err) => {
                    let orphaned: Vec<&str> = stored.values().map(String::as_str).collect();
                    warn!(
                        error = %err,
                        ?orphaned,
                        "attachment storage failed; earlier uploads are orphaned"
                    );
                    return Err(DocumentIntakeError::Storage(err));
                }
            }
        }

        Ok(stored)
    }

    /// Store one standalone document under a caller-chosen key.
    pub fn store_document(
        &self,
        key: &str,
        file: &FileUpload,
    ) -> Result<String, DocumentIntakeError> {
        self.policy
            .check(file, self.policy.document_file_limit_bytes)
            .map_err(|message| DocumentIntakeError::Rejected {
                field: "file".to_string(),
                message,
            })?;

        Ok(self.store.store(key, &file.content_type, &file.bytes)?)
    }
}

/// Lowercased extension of `name` including the dot, or empty.
pub(crate) fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}
