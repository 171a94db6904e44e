//! Field validation for samples entering the system.
//!
//! The analysis core does not validate its input; these checks belong at
//! the ingestion boundary (sample upload, bulk edit).

use std::sync::LazyLock;

use chrono::NaiveDate;
use mimosa_sample_models::SampleProperties;
use regex::Regex;

use crate::PostcodeTable;

/// Country prefix applied to bare postcode digits.
pub const DEFAULT_COUNTRY: &str = "SE";

/// Strict `YYYY-MM-DD` shape.
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Canonical `"<CC>-<5 digits>"` postcode shape.
static POST_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}-\d{5}$").expect("valid regex"));

/// Reasons a sample field is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Postcode must be 5 digits.")]
    PostCodeDigits,

    #[error("Postcode {0} is not supported.")]
    UnsupportedPostCode(String),

    #[error("Invalid date format (YYYY-MM-DD).")]
    DateFormat,

    #[error("Invalid calendar date.")]
    CalendarDate,

    #[error("Date cannot be in the future.")]
    FutureDate,
}

/// Returns `true` if `value` already has the canonical postcode shape.
#[must_use]
pub fn is_canonical_post_code(value: &str) -> bool {
    POST_CODE_RE.is_match(value)
}

/// Normalizes a user-entered postcode and checks it against the table.
///
/// Non-digit characters are dropped (`"SE-751 85"`, `"75185"` and
/// `"751-85"` all normalize the same), the remaining digits must number
/// exactly five, and the result is prefixed with `country`. Blank input is
/// accepted as "no postcode".
///
/// # Errors
///
/// Returns [`ValidationError::PostCodeDigits`] for the wrong number of
/// digits and [`ValidationError::UnsupportedPostCode`] if the normalized
/// postcode is not in `table`.
pub fn validate_post_code(
    value: &str,
    country: &str,
    table: &PostcodeTable,
) -> Result<Option<String>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(None);
    }

    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 5 {
        return Err(ValidationError::PostCodeDigits);
    }

    let post_code = format!("{country}-{digits}");
    if !table.contains(&post_code) {
        return Err(ValidationError::UnsupportedPostCode(post_code));
    }

    Ok(Some(post_code))
}

/// Validates a collection date against `today`.
///
/// Blank input is accepted as "no date".
///
/// # Errors
///
/// Returns a [`ValidationError`] if the value is not `YYYY-MM-DD`, is not a
/// real calendar date, or lies after `today`.
pub fn validate_date(value: &str, today: NaiveDate) -> Result<Option<NaiveDate>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if !ISO_DATE_RE.is_match(value) {
        return Err(ValidationError::DateFormat);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::CalendarDate)?;

    if date > today {
        return Err(ValidationError::FutureDate);
    }

    Ok(Some(date))
}

/// Runs the postcode and date checks on a stored sample.
///
/// A canonical postcode is checked under its own country prefix; anything
/// else is normalized under [`DEFAULT_COUNTRY`]. A time suffix on the date
/// is ignored.
#[must_use]
pub fn validate_sample(
    sample: &SampleProperties,
    table: &PostcodeTable,
    today: NaiveDate,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(post_code) = sample.post_code.as_deref() {
        let country = if is_canonical_post_code(post_code) {
            &post_code[..2]
        } else {
            DEFAULT_COUNTRY
        };
        if let Err(e) = validate_post_code(post_code, country, table) {
            errors.push(e);
        }
    }

    let date = sample.date.split('T').next().unwrap_or_default();
    if let Err(e) = validate_date(date, today) {
        errors.push(e);
    }

    errors
}

/// Parses a sample date, tolerating a trailing time component
/// (`"2024-03-01T10:00:00"`).
#[must_use]
pub fn parse_sample_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
