//! Client-side multi-step form controller.
//!
//! The controller owns a single draft record across every step. Moving
//! forward requires the current step to validate; moving back never does,
//! and later-step data is retained either way. Only a successful
//! `submit()` from the final step produces a transport payload.

use std::collections::BTreeMap;

use super::documents::FileUpload;
use super::domain::AttachmentSlot;
use super::ingest::RawSubmission;
use super::schema::{self, FieldMap, FieldValue, FieldViolation, FormStep};

/// Errors blocking a submission attempt.
#[derive(Debug, thiserror::Error)]
pub enum SubmitBlocked {
    #[error("submission is only available from the final step")]
    NotOnFinalStep,
    #[error("draft has invalid fields")]
    Invalid(Vec<FieldViolation>),
}

/// Wire-ready payload assembled at final submission: serialized text
/// fields plus binary attachment parts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(AttachmentSlot, FileUpload)>,
}

impl SubmissionPayload {
    /// Reshape into the form the ingestion gate consumes.
    pub fn into_raw(self) -> RawSubmission {
        RawSubmission {
            fields: self.fields.into_iter().collect(),
            files: self.files,
        }
    }
}

/// In-memory state of the applicant's registration form.
#[derive(Debug, Default)]
pub struct RegistrationForm {
    step: FormStep,
    draft: FieldMap,
    errors: BTreeMap<String, String>,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn draft(&self) -> &FieldMap {
        &self.draft
    }

    /// Field errors surfaced by the most recent validation.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn set(&mut self, name: &'static str, value: FieldValue) {
        self.draft.insert(name, value);
    }

    pub fn clear(&mut self, name: &str) {
        self.draft.remove(name);
    }

    /// Validate only the current step's fields. Fields belonging to other
    /// steps are never reported.
    pub fn validate_step(&mut self) -> bool {
        let violations = schema::validate_step(&self.draft, self.step);
        self.replace_errors(violations);
        self.errors.is_empty()
    }

    /// Advance to the next step if the current one validates. On failure
    /// the step index and the draft are left untouched.
    pub fn advance(&mut self) -> bool {
        if !self.validate_step() {
            return false;
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        true
    }

    /// Move back one step. No validation; entered data is preserved.
    pub fn retreat(&mut self) {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.errors.clear();
    }

    /// Re-validate every step and assemble the transport payload.
    ///
    /// Earlier steps are re-checked because the draft may have been edited
    /// after they were first passed. Failure reports field errors and
    /// keeps the draft intact.
    pub fn submit(&mut self) -> Result<SubmissionPayload, SubmitBlocked> {
        if !self.step.is_final() {
            return Err(SubmitBlocked::NotOnFinalStep);
        }

        let violations = schema::validate_all(&self.draft);
        if !violations.is_empty() {
            self.replace_errors(violations.clone());
            return Err(SubmitBlocked::Invalid(violations));
        }

        let mut fields = Vec::new();
        let mut files = Vec::new();

        for (name, value) in &self.draft {
            match value {
                FieldValue::File(upload) => {
                    if let Some(slot) = AttachmentSlot::parse(name) {
                        files.push((slot, upload.clone()));
                    }
                }
                other => {
                    if let Some(rendered) = render(other) {
                        fields.push(((*name).to_string(), rendered));
                    }
                }
            }
        }

        Ok(SubmissionPayload { fields, files })
    }

    fn replace_errors(&mut self, violations: Vec<FieldViolation>) {
        self.errors = violations
            .into_iter()
            .map(|violation| (violation.field, violation.message))
            .collect();
    }
}

/// Serialize one canonical value for the multipart transport: numbers and
/// booleans become strings, lists become JSON text, dates ISO 8601.
fn render(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(text) => Some(text.clone()),
        FieldValue::Number(number) => Some(render_number(*number)),
        FieldValue::Flag(flag) => Some(flag.to_string()),
        FieldValue::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
        FieldValue::TextList(items) => {
            Some(serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string()))
        }
        FieldValue::References(references) => {
            Some(serde_json::to_string(references).unwrap_or_else(|_| "[]".to_string()))
        }
        FieldValue::File(_) => None,
    }
}

fn render_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
