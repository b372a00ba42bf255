//! Server-side ingestion gate.
//!
//! Whatever the client claims it validated, the raw payload is coerced and
//! re-checked here against the same field registry. The outcome is either
//! a fully typed input record or a structured list of field violations.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::coerce;
use super::documents::FileUpload;
use super::domain::{
    AttachmentSlot, Gender, JobType, MaritalStatus, NoticePeriodUnit, ProcessingUrgency,
    Reference, Registration, RegistrationId, RegistrationStatus, UserId, VisaType,
};
use super::schema::{self, FieldMap, FieldValue, FieldViolation};

/// Decoded multipart request: loosely typed text fields plus the file
/// parts recognized as attachment slots.
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
    pub fields: BTreeMap<String, String>,
    pub files: Vec<(AttachmentSlot, FileUpload)>,
}

/// Typed, validated submission ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationInput {
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
    pub preferred_locations: Vec<String>,
    pub willing_to_relocate: bool,
    pub preferred_job_types: Vec<JobType>,
    pub expected_salary: u32,
    pub notice_period_value: u32,
    pub notice_period_unit: NoticePeriodUnit,
    pub visa_type: Option<VisaType>,
    pub processing_urgency: Option<ProcessingUrgency>,
    pub references: Vec<Reference>,
    pub confirm_accuracy: bool,
    pub terms_accepted: bool,
    pub background_check_consent: bool,
}

impl RegistrationInput {
    /// Coerce and validate a raw payload into a typed input.
    pub fn from_raw(submission: &RawSubmission) -> Result<Self, Vec<FieldViolation>> {
        let mut values = FieldMap::new();
        for field in schema::registry() {
            if let Some(raw) = submission.fields.get(field.name) {
                if let Some(value) = coerce::field_value(&field.rule, raw) {
                    values.insert(field.name, value);
                }
            }
        }

        let violations = schema::validate_all(&values);
        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(Self::from_values(&mut values))
    }

    // Extraction is total: validation has already established that every
    // required field is present with the right shape, so the fallbacks
    // below are unreachable.
    fn from_values(values: &mut FieldMap) -> Self {
        Self {
            first_name: take_text(values, "firstName"),
            middle_name: take_optional_text(values, "middleName"),
            last_name: take_text(values, "lastName"),
            date_of_birth: take_date(values, "dateOfBirth"),
            gender: Gender::parse(&take_text(values, "gender")).unwrap_or(Gender::Other),
            marital_status: MaritalStatus::parse(&take_text(values, "maritalStatus"))
                .unwrap_or(MaritalStatus::Other),
            email: take_text(values, "email"),
            phone_number: take_text(values, "phoneNumber"),
            current_location: take_text(values, "currentLocation"),
            country: take_text(values, "country"),
            city: take_text(values, "city"),
            address: take_text(values, "address"),
            postal_code: take_text(values, "postalCode"),
            emergency_contact_name: take_text(values, "emergencyContactName"),
            emergency_contact_phone: take_text(values, "emergencyContactPhone"),
            profession: take_text(values, "profession"),
            specialization: take_optional_text(values, "specialization"),
            years_of_experience: take_text(values, "yearsOfExperience"),
            current_employer: take_optional_text(values, "currentEmployer"),
            job_title: take_text(values, "jobTitle"),
            has_professional_license: take_flag(values, "hasProfessionalLicense"),
            license_type: take_optional_text(values, "licenseType"),
            license_number: take_optional_text(values, "licenseNumber"),
            issuing_organization: take_optional_text(values, "issuingOrganization"),
            license_expiry_date: take_optional_date(values, "licenseExpiryDate"),
            licensing_status: take_optional_text(values, "licensingStatus"),
            preferred_locations: take_list(values, "preferredLocations"),
            willing_to_relocate: take_flag(values, "willingToRelocate"),
            preferred_job_types: take_list(values, "preferredJobTypes")
                .iter()
                .filter_map(|token| JobType::parse(token))
                .collect(),
            expected_salary: take_number(values, "expectedSalary") as u32,
            notice_period_value: take_number(values, "noticePeriodValue") as u32,
            notice_period_unit: NoticePeriodUnit::parse(&take_text(values, "noticePeriodUnit"))
                .unwrap_or(NoticePeriodUnit::Days),
            visa_type: take_optional_text(values, "visaType")
                .as_deref()
                .and_then(VisaType::parse),
            processing_urgency: take_optional_text(values, "processingUrgency")
                .as_deref()
                .and_then(ProcessingUrgency::parse),
            references: take_references(values, "references"),
            confirm_accuracy: take_flag(values, "confirmAccuracy"),
            terms_accepted: take_flag(values, "termsAccepted"),
            background_check_consent: take_flag(values, "backgroundCheckConsent"),
        }
    }

    /// Build the durable record for a fresh submission.
    pub fn into_registration(
        self,
        id: RegistrationId,
        user_id: UserId,
        documents: BTreeMap<AttachmentSlot, String>,
        now: DateTime<Utc>,
    ) -> Registration {
        Registration {
            id,
            user_id,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            marital_status: self.marital_status,
            email: self.email,
            phone_number: self.phone_number,
            current_location: self.current_location,
            country: self.country,
            city: self.city,
            address: self.address,
            postal_code: self.postal_code,
            emergency_contact_name: self.emergency_contact_name,
            emergency_contact_phone: self.emergency_contact_phone,
            profession: self.profession,
            specialization: self.specialization,
            years_of_experience: self.years_of_experience,
            current_employer: self.current_employer,
            job_title: self.job_title,
            has_professional_license: self.has_professional_license,
            license_type: self.license_type,
            license_number: self.license_number,
            issuing_organization: self.issuing_organization,
            license_expiry_date: self.license_expiry_date,
            licensing_status: self.licensing_status,
            preferred_locations: self.preferred_locations,
            willing_to_relocate: self.willing_to_relocate,
            preferred_job_types: self.preferred_job_types,
            expected_salary: self.expected_salary,
            notice_period_value: self.notice_period_value,
            notice_period_unit: self.notice_period_unit,
            visa_type: self.visa_type,
            processing_urgency: self.processing_urgency,
            references: self.references,
            confirm_accuracy: self.confirm_accuracy,
            terms_accepted: self.terms_accepted,
            background_check_consent: self.background_check_consent,
            documents,
            status: RegistrationStatus::Submitted,
            status_updated_at: None,
            status_updated_by: None,
            notes: None,
            submitted_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

fn take_text(values: &mut FieldMap, name: &str) -> String {
    match values.remove(name) {
        Some(FieldValue::Text(text)) => text,
        _ => String::new(),
    }
}

fn take_optional_text(values: &mut FieldMap, name: &str) -> Option<String> {
    match values.remove(name) {
        Some(FieldValue::Text(text)) => Some(text),
        _ => None,
    }
}

fn take_date(values: &mut FieldMap, name: &str) -> NaiveDate {
    match values.remove(name) {
        Some(FieldValue::Date(date)) => date,
        _ => NaiveDate::default(),
    }
}

fn take_optional_date(values: &mut FieldMap, name: &str) -> Option<NaiveDate> {
    match values.remove(name) {
        Some(FieldValue::Date(date)) => Some(date),
        _ => None,
    }
}

fn take_flag(values: &mut FieldMap, name: &str) -> bool {
    matches!(values.remove(name), Some(FieldValue::Flag(true)))
}

fn take_number(values: &mut FieldMap, name: &str) -> f64 {
    match values.remove(name) {
        Some(FieldValue::Number(number)) => number,
        _ => 0.0,
    }
}

fn take_list(values: &mut FieldMap, name: &str) -> Vec<String> {
    match values.remove(name) {
        Some(FieldValue::TextList(items)) => items,
        _ => Vec::new(),
    }
}

fn take_references(values: &mut FieldMap, name: &str) -> Vec<Reference> {
    match values.remove(name) {
        Some(FieldValue::References(references)) => references,
        _ => Vec::new(),
    }
}
