//! Field-level validation shared by all records.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9()\-.\s]+$").expect("valid phone regex"));
static CLOCK_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$").expect("valid time regex"));

const PHONE_MIN_DIGITS: usize = 7;
const PHONE_MAX_DIGITS: usize = 15;

/// Record validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is missing or blank.
    MissingField(&'static str),
    InvalidEmail(String),
    InvalidPhone(String),
    /// Field is present but violates a shape or range rule.
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field is missing: {field}"),
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::InvalidPhone(value) => write!(f, "invalid phone number: `{value}`"),
            Self::InvalidValue { field, message } => write!(f, "invalid {field}: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Requires a non-blank text value.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Requires every list entry to be non-blank.
pub fn require_non_blank_entries(
    field: &'static str,
    values: &[String],
) -> Result<(), ValidationError> {
    if values.iter().any(|value| value.trim().is_empty()) {
        return Err(ValidationError::invalid(field, "entries must not be blank"));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(value.trim()) {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}

/// Accepts digits with common separators and 7 to 15 digits in total.
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    if !PHONE_CHARS_RE.is_match(trimmed) || !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits)
    {
        return Err(ValidationError::InvalidPhone(value.to_string()));
    }
    Ok(())
}

pub fn validate_optional_email(value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(email) if !email.trim().is_empty() => validate_email(email),
        _ => Ok(()),
    }
}

pub fn validate_optional_phone(value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(phone) if !phone.trim().is_empty() => validate_phone(phone),
        _ => Ok(()),
    }
}

/// Parses a 24-hour `HH:MM` value into minutes after midnight.
pub fn parse_clock_time(value: &str) -> Option<u32> {
    let caps = CLOCK_TIME_RE.captures(value.trim())?;
    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some(hours * 60 + minutes)
}
