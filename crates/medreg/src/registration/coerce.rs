//! Coercion of multipart transport strings into canonical field values.
//!
//! Policies:
//! - empty string means "not provided" and coerces to absent, never `""`;
//! - booleans accept "true"/"false" in any case, anything else is absent;
//! - non-numeric numbers coerce to absent rather than erroring, so blank
//!   optional inputs pass through;
//! - JSON-encoded arrays that fail to parse yield an empty list; a
//!   required list then surfaces as a field violation downstream;
//! - enum tokens are matched case-insensitively and canonicalized to the
//!   registry's option spelling;
//! - dates accept `YYYY-MM-DD` or an RFC 3339 timestamp.

use chrono::{DateTime, NaiveDate};

use super::domain::Reference;
use super::schema::{FieldRule, FieldValue};

pub fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|timestamp| timestamp.date_naive())
        })
}

pub fn string_list(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn references(raw: &str) -> Vec<Reference> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_default()
}

/// Case-insensitive match against `options`, canonicalized to the option's
/// own spelling.
pub fn choice(raw: &str, options: &[&'static str]) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(trimmed));
    match canonical {
        Some(option) => Some((*option).to_string()),
        // Unknown tokens pass through so validation can name them.
        None => Some(trimmed.to_string()),
    }
}

/// Coerce one raw transport string according to the field's rule.
///
/// `None` means the value is absent; whether that is acceptable is the
/// schema's call, not the coercion layer's.
pub fn field_value(rule: &FieldRule, raw: &str) -> Option<FieldValue> {
    match rule {
        FieldRule::Text { .. } | FieldRule::Email | FieldRule::Phone => {
            text(raw).map(FieldValue::Text)
        }
        FieldRule::Date => date(raw).map(FieldValue::Date),
        FieldRule::Choice { options } => choice(raw, options).map(FieldValue::Text),
        FieldRule::Number { .. } => number(raw).map(FieldValue::Number),
        FieldRule::Flag | FieldRule::MustAccept => flag(raw).map(FieldValue::Flag),
        FieldRule::TextList { .. } => Some(FieldValue::TextList(string_list(raw))),
        FieldRule::ChoiceList { options, .. } => {
            let canonical = string_list(raw)
                .into_iter()
                .map(|item| choice(&item, options).unwrap_or(item))
                .collect();
            Some(FieldValue::TextList(canonical))
        }
        FieldRule::References { .. } => Some(FieldValue::References(references(raw))),
        // File parts never travel as text fields.
        FieldRule::File => None,
    }
}
