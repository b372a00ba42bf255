use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationId(pub String);

/// Identifier wrapper for standalone document uploads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachmentId(pub String);

/// Identifier of the account owning a registration or document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Verified caller identity, supplied by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Applicant,
}

impl Role {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "APPLICANT" | "USER" => Some(Self::Applicant),
            _ => None,
        }
    }
}

/// Lifecycle state of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    MoreInfoNeeded,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 6] = [
        RegistrationStatus::Draft,
        RegistrationStatus::Submitted,
        RegistrationStatus::UnderReview,
        RegistrationStatus::Approved,
        RegistrationStatus::Rejected,
        RegistrationStatus::MoreInfoNeeded,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RegistrationStatus::Draft => "DRAFT",
            RegistrationStatus::Submitted => "SUBMITTED",
            RegistrationStatus::UnderReview => "UNDER_REVIEW",
            RegistrationStatus::Approved => "APPROVED",
            RegistrationStatus::Rejected => "REJECTED",
            RegistrationStatus::MoreInfoNeeded => "MORE_INFO_NEEDED",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let normalized = token.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "MALE" => Some(Self::Male),
            "FEMALE" => Some(Self::Female),
            "OTHER" => Some(Self::Other),
            "PREFER_NOT_TO_SAY" => Some(Self::PreferNotToSay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
    Other,
}

impl MaritalStatus {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "SINGLE" => Some(Self::Single),
            "MARRIED" => Some(Self::Married),
            "DIVORCED" => Some(Self::Divorced),
            "WIDOWED" => Some(Self::Widowed),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
}

impl JobType {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "full_time" => Some(Self::FullTime),
            "part_time" => Some(Self::PartTime),
            "contract" => Some(Self::Contract),
            "temporary" => Some(Self::Temporary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticePeriodUnit {
    Days,
    Weeks,
    Months,
}

impl NoticePeriodUnit {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "days" => Some(Self::Days),
            "weeks" => Some(Self::Weeks),
            "months" => Some(Self::Months),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisaType {
    Employment,
    Psv,
    Family,
    Visit,
}

impl VisaType {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "EMPLOYMENT" => Some(Self::Employment),
            "PSV" => Some(Self::Psv),
            "FAMILY" => Some(Self::Family),
            "VISIT" => Some(Self::Visit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingUrgency {
    Standard,
    Urgent,
    Emergency,
}

impl ProcessingUrgency {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "STANDARD" => Some(Self::Standard),
            "URGENT" => Some(Self::Urgent),
            "EMERGENCY" => Some(Self::Emergency),
            _ => None,
        }
    }
}

/// Professional reference supplied with an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub position: String,
    pub company: String,
    pub email: String,
    pub phone: String,
}

/// Named upload slots on the registration form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentSlot {
    Passport,
    License,
    Degree,
    Experience,
    MedicalReport,
    Photo,
    PoliceClearance,
    Resume,
}

impl AttachmentSlot {
    pub const ALL: [AttachmentSlot; 8] = [
        AttachmentSlot::Passport,
        AttachmentSlot::License,
        AttachmentSlot::Degree,
        AttachmentSlot::Experience,
        AttachmentSlot::MedicalReport,
        AttachmentSlot::Photo,
        AttachmentSlot::PoliceClearance,
        AttachmentSlot::Resume,
    ];

    pub const fn field_name(self) -> &'static str {
        match self {
            AttachmentSlot::Passport => "passport",
            AttachmentSlot::License => "license",
            AttachmentSlot::Degree => "degree",
            AttachmentSlot::Experience => "experience",
            AttachmentSlot::MedicalReport => "medicalReport",
            AttachmentSlot::Photo => "photo",
            AttachmentSlot::PoliceClearance => "policeClearance",
            AttachmentSlot::Resume => "resume",
        }
    }

    pub fn parse(field: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.field_name() == field)
    }
}

/// Classification recorded against standalone document uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    Resume,
    Passport,
    Certificate,
    License,
    MedicalReport,
    PoliceClearance,
    Photo,
    Other,
}

impl DocumentKind {
    /// Unknown classifications fall back to `Other` rather than rejecting.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "RESUME" => Self::Resume,
            "PASSPORT" => Self::Passport,
            "CERTIFICATE" => Self::Certificate,
            "LICENSE" => Self::License,
            "MEDICAL_REPORT" => Self::MedicalReport,
            "POLICE_CLEARANCE" => Self::PoliceClearance,
            "PHOTO" => Self::Photo,
            _ => Self::Other,
        }
    }
}

/// Longest admin note accepted on a status update.
pub const MAX_NOTES_LEN: usize = 2000;

/// The durable applicant record. One row per owning user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RegistrationId,
    pub user_id: UserId,

    // Personal
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub email: String,
    pub phone_number: String,
    pub current_location: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub postal_code: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,

    // Professional
    pub profession: String,
    pub specialization: Option<String>,
    pub years_of_experience: String,
    pub current_employer: Option<String>,
    pub job_title: String,
    pub has_professional_license: bool,
    pub license_type: Option<String>,
    pub license_number: Option<String>,
    pub issuing_organization: Option<String>,
    pub license_expiry_date: Option<NaiveDate>,
    pub licensing_status: Option<String>,

    // Preferences
    pub preferred_locations: Vec<String>,
    pub willing_to_relocate: bool,
    pub preferred_job_types: Vec<JobType>,
    pub expected_salary: u32,
    pub notice_period_value: u32,
    pub notice_period_unit: NoticePeriodUnit,
    pub visa_type: Option<VisaType>,
    pub processing_urgency: Option<ProcessingUrgency>,

    // References & declaration
    pub references: Vec<Reference>,
    pub confirm_accuracy: bool,
    pub terms_accepted: bool,
    pub background_check_consent: bool,

    /// Stored document URLs keyed by slot; an absent slot was not provided.
    pub documents: BTreeMap<AttachmentSlot, String>,

    pub status: RegistrationStatus,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub status_updated_by: Option<UserId>,
    pub notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record of a standalone document upload. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,
    pub user_id: UserId,
    pub registration_id: Option<RegistrationId>,
    pub file_name: String,
    pub file_type: String,
    pub file_size: usize,
    pub file_url: String,
    pub document_type: DocumentKind,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}
