//! Onboarding form validation
//!
//! Profile documents are free-form JSON; only the fields checked here have a
//! fixed shape. Every failure is an [`Error::InvalidInput`] carrying the
//! message shown next to the form.

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Days checked in business-hours validation, in display order
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const PARENT_PHONE_MESSAGE: &str = "Please enter phone in E.164 format, e.g., +12045550123";
const PROVIDER_PHONE_MESSAGE: &str = "Phone must be E.164 format, e.g., +12045550123";

/// Keep only `+` and ASCII digits
pub fn strip_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c == '+' || c.is_ascii_digit())
        .collect()
}

fn all_digits(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

/// Parent phone: `+1` followed by exactly ten digits after stripping
pub fn validate_parent_phone(raw: &str) -> Result<String> {
    let phone = strip_phone(raw);
    match phone.strip_prefix("+1") {
        Some(rest) if rest.len() == 10 && all_digits(rest) => Ok(phone),
        _ => Err(Error::InvalidInput(PARENT_PHONE_MESSAGE.to_string())),
    }
}

/// Provider contact phone: optional, otherwise `+` and 8 to 15 digits
///
/// Returns the stripped form, which is empty when nothing was entered.
pub fn validate_provider_phone(raw: &str) -> Result<String> {
    let phone = strip_phone(raw);
    if phone.is_empty() {
        return Ok(phone);
    }
    match phone.strip_prefix('+') {
        Some(rest) if (8..=15).contains(&rest.len()) && all_digits(rest) => Ok(phone),
        _ => Err(Error::InvalidInput(PROVIDER_PHONE_MESSAGE.to_string())),
    }
}

/// Split a comma-separated entry, trimming and dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize)]
struct DayHours {
    #[serde(default)]
    open: String,
    #[serde(default)]
    close: String,
    #[serde(default)]
    closed: bool,
}

/// Every open day must open strictly before it closes
///
/// Times are `HH:MM` strings and compare lexically. Days missing from the
/// map are not checked.
pub fn validate_business_hours(hours: &Value) -> Result<()> {
    for day in WEEKDAYS {
        let Some(entry) = hours.get(day) else {
            continue;
        };
        let entry: DayHours = serde_json::from_value(entry.clone())
            .map_err(|_| Error::InvalidInput(format!("{}: invalid business hours", day)))?;

        if !entry.closed && entry.open >= entry.close {
            return Err(Error::InvalidInput(format!(
                "{}: open time must be before close time",
                day
            )));
        }
    }
    Ok(())
}

/// Validate a parent profile and store the stripped phone
pub fn prepare_parent_profile(mut profile: Value) -> Result<Value> {
    let raw = profile
        .get("phone")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let phone = validate_parent_phone(&raw)?;

    match profile.as_object_mut() {
        Some(fields) => {
            fields.insert("phone".to_string(), Value::String(phone));
            Ok(profile)
        }
        None => Err(Error::InvalidInput("profile must be an object".to_string())),
    }
}

/// Validate a provider profile fragment before it is merged
///
/// Handles the organisation step (`contactPhone`, comma-separated
/// `languages`/`tags`) and the services step (`services.businessHours`);
/// either may be absent.
pub fn prepare_provider_profile(mut fragment: Value) -> Result<Value> {
    let Some(fields) = fragment.as_object_mut() else {
        return Err(Error::InvalidInput("provider must be an object".to_string()));
    };

    if let Some(raw) = fields.get("contactPhone").and_then(Value::as_str) {
        let phone = validate_provider_phone(raw)?;
        fields.insert("contactPhone".to_string(), Value::String(phone));
    }

    for key in ["languages", "tags"] {
        if let Some(raw) = fields.get(key).and_then(Value::as_str) {
            let items = split_list(raw).into_iter().map(Value::String).collect();
            fields.insert(key.to_string(), Value::Array(items));
        }
    }

    if let Some(hours) = fields.get("services").and_then(|s| s.get("businessHours")) {
        validate_business_hours(hours)?;
    }

    Ok(fragment)
}
