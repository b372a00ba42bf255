//! Single source of truth for the registration form's field shape.
//!
//! The same registry backs step-scoped validation in the client-side form
//! controller and full-payload validation in the server-side ingestion
//! gate, so the two can never drift apart.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::documents::FileUpload;
use super::domain::Reference;

/// Ordered steps of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormStep {
    Personal,
    Professional,
    Preferences,
    Documents,
}

impl Default for FormStep {
    fn default() -> Self {
        FormStep::Personal
    }
}

impl FormStep {
    pub const ALL: [FormStep; 4] = [
        FormStep::Personal,
        FormStep::Professional,
        FormStep::Preferences,
        FormStep::Documents,
    ];

    pub const fn number(self) -> u8 {
        match self {
            FormStep::Personal => 1,
            FormStep::Professional => 2,
            FormStep::Preferences => 3,
            FormStep::Documents => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FormStep::Personal => "Personal Info",
            FormStep::Professional => "Professional",
            FormStep::Preferences => "Preferences",
            FormStep::Documents => "Documents & Declaration",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            FormStep::Personal => Some(FormStep::Professional),
            FormStep::Professional => Some(FormStep::Preferences),
            FormStep::Preferences => Some(FormStep::Documents),
            FormStep::Documents => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            FormStep::Personal => None,
            FormStep::Professional => Some(FormStep::Personal),
            FormStep::Preferences => Some(FormStep::Professional),
            FormStep::Documents => Some(FormStep::Preferences),
        }
    }

    pub const fn is_final(self) -> bool {
        matches!(self, FormStep::Documents)
    }
}

/// Canonical, typed value of a single form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
    Date(NaiveDate),
    TextList(Vec<String>),
    References(Vec<Reference>),
    File(FileUpload),
}

/// Draft and ingestion records are keyed by wire field name.
pub type FieldMap = BTreeMap<&'static str, FieldValue>;

/// Validation constraint attached to a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRule {
    Text { min_len: usize },
    Email,
    Phone,
    Date,
    Choice { options: &'static [&'static str] },
    Number { min: f64, max: Option<f64> },
    Flag,
    MustAccept,
    TextList { min_items: usize },
    ChoiceList { options: &'static [&'static str], min_items: usize },
    References { min_items: usize },
    File,
}

/// One field of the combined registration schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub step: FormStep,
    pub rule: FieldRule,
    pub required: bool,
}

/// A single violated constraint, addressed by wire field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub const GENDERS: &[&str] = &["MALE", "FEMALE", "OTHER", "PREFER_NOT_TO_SAY"];
pub const MARITAL_STATUSES: &[&str] = &["SINGLE", "MARRIED", "DIVORCED", "WIDOWED", "OTHER"];
pub const JOB_TYPES: &[&str] = &["full_time", "part_time", "contract", "temporary"];
pub const NOTICE_PERIOD_UNITS: &[&str] = &["days", "weeks", "months"];
pub const VISA_TYPES: &[&str] = &["EMPLOYMENT", "PSV", "FAMILY", "VISIT"];
pub const PROCESSING_URGENCIES: &[&str] = &["STANDARD", "URGENT", "EMERGENCY"];

const MAX_EXPECTED_SALARY: f64 = 200_000.0;

static REGISTRY: &[FieldSpec] = &[
    // Step 1: personal and contact details.
    spec("firstName", FormStep::Personal, FieldRule::Text { min_len: 2 }, true),
    spec("middleName", FormStep::Personal, FieldRule::Text { min_len: 1 }, false),
    spec("lastName", FormStep::Personal, FieldRule::Text { min_len: 2 }, true),
    spec("dateOfBirth", FormStep::Personal, FieldRule::Date, true),
    spec("gender", FormStep::Personal, FieldRule::Choice { options: GENDERS }, true),
    spec(
        "maritalStatus",
        FormStep::Personal,
        FieldRule::Choice { options: MARITAL_STATUSES },
        true,
    ),
    spec("email", FormStep::Personal, FieldRule::Email, true),
    spec("phoneNumber", FormStep::Personal, FieldRule::Phone, true),
    spec("currentLocation", FormStep::Personal, FieldRule::Text { min_len: 2 }, true),
    spec("country", FormStep::Personal, FieldRule::Text { min_len: 2 }, true),
    spec("city", FormStep::Personal, FieldRule::Text { min_len: 2 }, true),
    spec("address", FormStep::Personal, FieldRule::Text { min_len: 2 }, true),
    spec("postalCode", FormStep::Personal, FieldRule::Text { min_len: 2 }, true),
    spec(
        "emergencyContactName",
        FormStep::Personal,
        FieldRule::Text { min_len: 2 },
        true,
    ),
    spec("emergencyContactPhone", FormStep::Personal, FieldRule::Phone, true),
    // Step 2: professional background and licensing.
    spec("profession", FormStep::Professional, FieldRule::Text { min_len: 1 }, true),
    spec("specialization", FormStep::Professional, FieldRule::Text { min_len: 1 }, false),
    spec(
        "yearsOfExperience",
        FormStep::Professional,
        FieldRule::Text { min_len: 1 },
        true,
    ),
    spec("currentEmployer", FormStep::Professional, FieldRule::Text { min_len: 1 }, false),
    spec("jobTitle", FormStep::Professional, FieldRule::Text { min_len: 1 }, true),
    spec("hasProfessionalLicense", FormStep::Professional, FieldRule::Flag, true),
    spec("licenseType", FormStep::Professional, FieldRule::Text { min_len: 1 }, false),
    spec("licenseNumber", FormStep::Professional, FieldRule::Text { min_len: 1 }, false),
    spec(
        "issuingOrganization",
        FormStep::Professional,
        FieldRule::Text { min_len: 1 },
        false,
    ),
    spec("licenseExpiryDate", FormStep::Professional, FieldRule::Date, false),
    spec("licensingStatus", FormStep::Professional, FieldRule::Text { min_len: 1 }, false),
    // Step 3: work preferences and visa details.
    spec(
        "preferredLocations",
        FormStep::Preferences,
        FieldRule::TextList { min_items: 1 },
        true,
    ),
    spec("willingToRelocate", FormStep::Preferences, FieldRule::Flag, true),
    spec(
        "preferredJobTypes",
        FormStep::Preferences,
        FieldRule::ChoiceList { options: JOB_TYPES, min_items: 1 },
        true,
    ),
    spec(
        "expectedSalary",
        FormStep::Preferences,
        FieldRule::Number { min: 0.0, max: Some(MAX_EXPECTED_SALARY) },
        true,
    ),
    spec(
        "noticePeriodValue",
        FormStep::Preferences,
        FieldRule::Number { min: 0.0, max: None },
        true,
    ),
    spec(
        "noticePeriodUnit",
        FormStep::Preferences,
        FieldRule::Choice { options: NOTICE_PERIOD_UNITS },
        true,
    ),
    spec("visaType", FormStep::Preferences, FieldRule::Choice { options: VISA_TYPES }, false),
    spec(
        "processingUrgency",
        FormStep::Preferences,
        FieldRule::Choice { options: PROCESSING_URGENCIES },
        false,
    ),
    // Step 4: documents, references, and declaration.
    spec("passport", FormStep::Documents, FieldRule::File, false),
    spec("license", FormStep::Documents, FieldRule::File, false),
    spec("degree", FormStep::Documents, FieldRule::File, false),
    spec("experience", FormStep::Documents, FieldRule::File, false),
    spec("medicalReport", FormStep::Documents, FieldRule::File, false),
    spec("photo", FormStep::Documents, FieldRule::File, false),
    spec("policeClearance", FormStep::Documents, FieldRule::File, false),
    spec("resume", FormStep::Documents, FieldRule::File, false),
    spec("references", FormStep::Documents, FieldRule::References { min_items: 1 }, true),
    spec("confirmAccuracy", FormStep::Documents, FieldRule::MustAccept, true),
    spec("termsAccepted", FormStep::Documents, FieldRule::MustAccept, true),
    spec("backgroundCheckConsent", FormStep::Documents, FieldRule::MustAccept, true),
];

const fn spec(name: &'static str, step: FormStep, rule: FieldRule, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        step,
        rule,
        required,
    }
}

/// The combined schema across every step.
pub fn registry() -> &'static [FieldSpec] {
    REGISTRY
}

/// The registry restricted to one step's field set.
pub fn fields_for_step(step: FormStep) -> impl Iterator<Item = &'static FieldSpec> {
    REGISTRY.iter().filter(move |field| field.step == step)
}

/// Validate only the fields belonging to `step`.
pub fn validate_step(values: &FieldMap, step: FormStep) -> Vec<FieldViolation> {
    validate(values, fields_for_step(step))
}

/// Validate the full combined schema.
pub fn validate_all(values: &FieldMap) -> Vec<FieldViolation> {
    validate(values, REGISTRY.iter())
}

fn validate<'a>(
    values: &FieldMap,
    fields: impl Iterator<Item = &'a FieldSpec>,
) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    for field in fields {
        match values.get(field.name) {
            None => {
                if field.required {
                    violations.push(FieldViolation::new(field.name, "is required"));
                }
            }
            Some(value) => {
                if let Some(message) = check(&field.rule, value) {
                    violations.push(FieldViolation::new(field.name, message));
                } else if let FieldRule::References { .. } = field.rule {
                    if let FieldValue::References(references) = value {
                        violations.extend(check_references(references));
                    }
                }
            }
        }
    }

    violations
}

fn check(rule: &FieldRule, value: &FieldValue) -> Option<String> {
    match (rule, value) {
        (FieldRule::Text { min_len }, FieldValue::Text(text)) => {
            if text.trim().chars().count() < *min_len {
                Some(format!("must be at least {min_len} characters"))
            } else {
                None
            }
        }
        (FieldRule::Email, FieldValue::Text(text)) => {
            if is_email(text) {
                None
            } else {
                Some("must be a valid email address".to_string())
            }
        }
        (FieldRule::Phone, FieldValue::Text(text)) => {
            if is_phone(text) {
                None
            } else {
                Some("must be a valid phone number".to_string())
            }
        }
        (FieldRule::Date, FieldValue::Date(_)) => None,
        (FieldRule::Choice { options }, FieldValue::Text(text)) => {
            if options
                .iter()
                .any(|option| option.eq_ignore_ascii_case(text))
            {
                None
            } else {
                Some(format!("must be one of: {}", options.join(", ")))
            }
        }
        (FieldRule::Number { min, max }, FieldValue::Number(number)) => {
            let above_max = max.map(|max| *number > max).unwrap_or(false);
            if *number < *min || above_max {
                match max {
                    Some(max) => Some(format!("must be between {min} and {max}")),
                    None => Some(format!("must be at least {min}")),
                }
            } else {
                None
            }
        }
        (FieldRule::Flag, FieldValue::Flag(_)) => None,
        (FieldRule::MustAccept, FieldValue::Flag(accepted)) => {
            if *accepted {
                None
            } else {
                Some("must be accepted".to_string())
            }
        }
        (FieldRule::TextList { min_items }, FieldValue::TextList(items)) => {
            if items.len() < *min_items {
                Some(format!("requires at least {min_items} entry"))
            } else {
                None
            }
        }
        (FieldRule::ChoiceList { options, min_items }, FieldValue::TextList(items)) => {
            if items.len() < *min_items {
                return Some(format!("requires at least {min_items} entry"));
            }
            let unknown = items.iter().find(|item| {
                !options
                    .iter()
                    .any(|option| option.eq_ignore_ascii_case(item))
            });
            unknown.map(|item| format!("'{item}' is not one of: {}", options.join(", ")))
        }
        (FieldRule::References { min_items }, FieldValue::References(references)) => {
            if references.len() < *min_items {
                Some(format!("requires at least {min_items} entry"))
            } else {
                None
            }
        }
        (FieldRule::File, FieldValue::File(_)) => None,
        _ => Some("has an unexpected value type".to_string()),
    }
}

fn check_references(references: &[Reference]) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    for (index, reference) in references.iter().enumerate() {
        if reference.name.trim().chars().count() < 2 {
            violations.push(FieldViolation::new(
                format!("references.{index}.name"),
                "must be at least 2 characters",
            ));
        }
        if reference.position.trim().chars().count() < 2 {
            violations.push(FieldViolation::new(
                format!("references.{index}.position"),
                "must be at least 2 characters",
            ));
        }
        if reference.company.trim().chars().count() < 2 {
            violations.push(FieldViolation::new(
                format!("references.{index}.company"),
                "must be at least 2 characters",
            ));
        }
        if !is_email(&reference.email) {
            violations.push(FieldViolation::new(
                format!("references.{index}.email"),
                "must be a valid email address",
            ));
        }
        if !is_phone(&reference.phone) {
            violations.push(FieldViolation::new(
                format!("references.{index}.phone"),
                "must be a valid phone number",
            ));
        }
    }

    violations
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn is_phone(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || " +()-".contains(c));
    allowed && digits >= 6
}
