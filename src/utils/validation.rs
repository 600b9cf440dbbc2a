use chrono::NaiveDate;
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::{Validate, ValidationError};

use crate::errors::AppError;

static GMAIL_RE: OnceLock<Regex> = OnceLock::new();
static FULL_NAME_RE: OnceLock<Regex> = OnceLock::new();
static ISO_DATE_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("valid pattern"))
}

fn gmail_re() -> &'static Regex {
    pattern(&GMAIL_RE, r"^[A-Za-z0-9._%+-]+@gmail\.com$")
}

fn full_name_re() -> &'static Regex {
    pattern(&FULL_NAME_RE, r"^[A-Za-zƏÖÜĞÇŞİIəöüğçşı \-']+$")
}

fn phone_re() -> &'static Regex {
    pattern(&PHONE_RE, r"^\+?\d{9,13}$")
}

fn iso_date_re() -> &'static Regex {
    pattern(&ISO_DATE_RE, r"^\d{4}-\d{2}-\d{2}$")
}

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(AppError::from)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// At least three characters, letters (Latin and Azerbaijani), spaces,
/// hyphens and apostrophes only.
pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    let v = name.trim();
    if v.chars().count() < 3 {
        return Err(invalid("full_name_length", "Full name must be at least 3 characters"));
    }
    if v.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("full_name_digits", "Full name must not contain digits"));
    }
    if !full_name_re().is_match(v) {
        return Err(invalid("full_name_chars", "Full name contains invalid characters"));
    }
    Ok(())
}

pub fn validate_gmail(email: &str) -> Result<(), ValidationError> {
    if !gmail_re().is_match(email.trim()) {
        return Err(invalid("gmail", "Email must be a Gmail address"));
    }
    Ok(())
}

/// 9 to 13 digits with an optional leading `+`, ignoring spaces, hyphens
/// and parentheses.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '-') && !c.is_whitespace())
        .collect();
    if digits.is_empty() {
        return Err(invalid("phone_required", "Phone number is required"));
    }
    if !phone_re().is_match(&digits) {
        return Err(invalid("phone", "Phone number is not valid"));
    }
    Ok(())
}

pub fn validate_positive_amount(value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value <= 0.0 {
        return Err(invalid("positive", "Must be greater than 0"));
    }
    Ok(())
}

/// Strict `YYYY-MM-DD` that names a real calendar day.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if !iso_date_re().is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    match parse_iso_date(value) {
        Some(_) => Ok(()),
        None => Err(invalid("iso_date", "Date must be a valid YYYY-MM-DD date")),
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "Must not be empty"));
    }
    Ok(())
}
