//! Format checks for plaintext personal-data fields
//!
//! Validation runs on decrypted records only. A field that is absent or empty
//! is not checked.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::record::Record;

/// Day.month.year format used for document dates
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Fields holding a `DD.MM.YYYY` date
pub const DATE_FIELDS: &[&str] = &[
    "passport_issue_date",
    "passport_birth_date",
    "vzh_issue_date",
    "vzh_expiry_date",
    "patent_issue_date",
    "patent_expiry_date",
];

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Field name to problem description, empty when the record is valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    /// Returns true when no field failed validation
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, field: &str, message: &str) {
        self.errors.insert(field.into(), message.into());
    }
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Accepts 10 digits starting with 9, or 11 digits starting with 7 or 8
///
/// Formatting characters are ignored.
pub fn validate_phone(phone: &str) -> bool {
    let clean = digits(phone);
    match clean.len() {
        10 => clean.starts_with('9'),
        11 => clean.starts_with('7') || clean.starts_with('8'),
        _ => false,
    }
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("Invalid email regex"))
        .is_match(email)
}

pub fn validate_passport_series(series: &str) -> bool {
    all_digits(series, 4)
}

pub fn validate_passport_number(number: &str) -> bool {
    all_digits(number, 6)
}

/// 10 digits for organisations, 12 for individuals
pub fn validate_inn(inn: &str) -> bool {
    matches!(digits(inn).len(), 10 | 12)
}

pub fn validate_snils(snils: &str) -> bool {
    digits(snils).len() == 11
}

/// Accepts a real calendar date in `DD.MM.YYYY` form
pub fn validate_date(date: &str) -> bool {
    NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok()
}

/// Full name needs at least a surname and a given name
pub fn validate_fio(fio: &str) -> bool {
    fio.split_whitespace().count() >= 2
}

/// Checks every known field of a decrypted record
pub fn validate_record(record: &Record) -> ValidationReport {
    let mut report = ValidationReport::default();
    let text = |field: &str| match record.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    };

    if let Some(fio) = text("fio") {
        if !validate_fio(fio) {
            report.fail("fio", "Incomplete full name");
        }
    }
    if let Some(phone) = text("phone") {
        if !validate_phone(phone) {
            report.fail("phone", "Invalid phone format");
        }
    }
    if let Some(email) = text("email") {
        if !validate_email(email) {
            report.fail("email", "Invalid email format");
        }
    }
    if let Some(series) = text("passport_series") {
        if !validate_passport_series(series) {
            report.fail("passport_series", "Invalid passport series");
        }
    }
    if let Some(number) = text("passport_number") {
        if !validate_passport_number(number) {
            report.fail("passport_number", "Invalid passport number");
        }
    }
    if let Some(inn) = text("inn") {
        if !validate_inn(inn) {
            report.fail("inn", "Invalid INN");
        }
    }
    if let Some(snils) = text("snils") {
        if !validate_snils(snils) {
            report.fail("snils", "Invalid SNILS");
        }
    }
    for &field in DATE_FIELDS {
        if let Some(date) = text(field) {
            if !validate_date(date) {
                report.fail(field, "Invalid date, expected DD.MM.YYYY");
            }
        }
    }

    report
}
