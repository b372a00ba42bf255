use std::sync::Arc;

use clap::Args;
use medreg::config::UploadConfig;
use medreg::error::AppError;
use medreg::registration::{
    DocumentPolicy, FieldValue, FileUpload, Identity, Reference, RegistrationForm,
    RegistrationService, RegistrationStatus, Role, StatusChange, UserId,
};

use crate::infra::{
    InMemoryAttachmentRepository, InMemoryBlobStore, InMemoryRegistrationRepository,
    LoggingNotifier,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the sample document upload portion of the demo.
    #[arg(long)]
    pub(crate) skip_documents: bool,
    /// Status the demo admin moves the registration to.
    #[arg(long, default_value = "UNDER_REVIEW")]
    pub(crate) target_status: String,
    /// Notes attached to the demo status change.
    #[arg(long, default_value = "scheduling a screening call")]
    pub(crate) notes: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        skip_documents,
        target_status,
        notes,
    } = args;

    println!("Registration workflow demo");

    let registrations = Arc::new(InMemoryRegistrationRepository::default());
    let notifier = Arc::new(LoggingNotifier::default());
    let service = Arc::new(RegistrationService::new(
        registrations,
        Arc::new(InMemoryAttachmentRepository::default()),
        Arc::new(InMemoryBlobStore::default()),
        notifier.clone(),
        demo_policy(),
    ));

    // Drive the same multi-step controller the web client uses.
    let mut form = demo_form();
    if !skip_documents {
        attach_demo_file(&mut form, "resume", "amina-haile-cv.pdf");
        attach_demo_file(&mut form, "passport", "passport-scan.jpg");
    }

    println!("- Filled steps 1-4; submitting from step {}", form.step().number());
    let payload = match form.submit() {
        Ok(payload) => payload,
        Err(err) => {
            println!("  Draft rejected client-side: {err}");
            return Ok(());
        }
    };
    println!(
        "  Payload: {} text fields, {} attachments",
        payload.fields.len(),
        payload.files.len()
    );

    let applicant = demo_applicant();
    let record = match service.submit(&applicant, payload.into_raw()) {
        Ok(record) => record,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Stored registration {} for {} {} -> status {}",
        record.id.0,
        record.first_name,
        record.last_name,
        record.status.label()
    );
    for (slot, url) in &record.documents {
        println!("  Attachment {}: {}", slot.field_name(), url);
    }

    let Some(status) = RegistrationStatus::parse(&target_status) else {
        println!("  Unknown target status '{target_status}', skipping review step");
        return Ok(());
    };

    let reviewed = match service.transition(
        &demo_admin(),
        &record.id,
        StatusChange {
            status,
            notes: Some(notes),
        },
    ) {
        Ok(reviewed) => reviewed,
        Err(err) => {
            println!("  Review step failed: {err}");
            return Ok(());
        }
    };
    println!(
        "- Admin review -> status {} (updated by {})",
        reviewed.status.label(),
        reviewed
            .status_updated_by
            .as_ref()
            .map(|user| user.0.as_str())
            .unwrap_or("unknown")
    );

    match serde_json::to_string_pretty(&reviewed) {
        Ok(json) => println!("  Stored record:\n{json}"),
        Err(err) => println!("  Stored record unavailable: {err}"),
    }

    let events = notifier.events();
    if events.is_empty() {
        println!("  Notifications: none dispatched");
    } else {
        println!("  Notifications:");
        for event in events {
            println!(
                "    - template={} -> {} ({})",
                event.template, event.recipient, event.subject
            );
        }
    }

    Ok(())
}

fn demo_policy() -> DocumentPolicy {
    let defaults = UploadConfig::default();
    DocumentPolicy {
        form_file_limit_bytes: defaults.form_file_limit_bytes,
        document_file_limit_bytes: defaults.document_file_limit_bytes,
        max_batch_files: defaults.max_batch_files,
    }
}

fn demo_applicant() -> Identity {
    Identity {
        user_id: UserId("demo-user".to_string()),
        email: "amina.haile@example.com".to_string(),
        name: Some("Amina Haile".to_string()),
        role: Role::Applicant,
    }
}

fn demo_admin() -> Identity {
    Identity {
        user_id: UserId("demo-admin".to_string()),
        email: "ops@example.com".to_string(),
        name: None,
        role: Role::Admin,
    }
}

fn attach_demo_file(form: &mut RegistrationForm, slot: &'static str, file_name: &str) {
    let content_type = mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    form.set(
        slot,
        FieldValue::File(FileUpload {
            file_name: file_name.to_string(),
            content_type,
            bytes: b"demo bytes".to_vec(),
        }),
    );
}

fn demo_form() -> RegistrationForm {
    let mut form = RegistrationForm::new();

    form.set("firstName", FieldValue::Text("Amina".to_string()));
    form.set("lastName", FieldValue::Text("Haile".to_string()));
    form.set(
        "dateOfBirth",
        FieldValue::Date(
            chrono::NaiveDate::from_ymd_opt(1990, 4, 12).unwrap_or_default(),
        ),
    );
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
    let advanced = form.advance();
    debug_assert!(advanced, "personal step is complete");

    form.set("profession", FieldValue::Text("Registered Nurse".to_string()));
    form.set("specialization", FieldValue::Text("Pediatrics".to_string()));
    form.set("yearsOfExperience", FieldValue::Text("5-10".to_string()));
    form.set("jobTitle", FieldValue::Text("Senior Nurse".to_string()));
    form.set("hasProfessionalLicense", FieldValue::Flag(true));
    form.set("licenseNumber", FieldValue::Text("RN-5521".to_string()));
    let advanced = form.advance();
    debug_assert!(advanced, "professional step is complete");

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
    form.set("visaType", FieldValue::Text("EMPLOYMENT".to_string()));
    let advanced = form.advance();
    debug_assert!(advanced, "preferences step is complete");

    form.set(
        "references",
        FieldValue::References(vec![Reference {
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

    form
}
