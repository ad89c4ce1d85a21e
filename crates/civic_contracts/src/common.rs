#![forbid(unsafe_code)]

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

pub const TEXT_MAX_LEN: usize = 256;
pub const NOTES_MAX_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("{field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    #[error("{field}: '{value}' is not a valid date")]
    InvalidDate { field: &'static str, value: String },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

/// Identifier of a ledger record. Ledger ids are decimal numerals issued by the
/// storage allocator; ids loaded from older snapshots may be arbitrary text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(v.into());
        v.validate()?;
        Ok(v)
    }

    pub fn from_number(n: u64) -> Self {
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, if it is a decimal numeral.
    pub fn as_number(&self) -> Option<u64> {
        self.0.trim().parse::<u64>().ok()
    }
}

impl Validate for RecordId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("record_id", &self.0, 64)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

pub fn validate_text(field: &'static str, value: &str, max_len: usize) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

pub fn validate_opt_text(
    field: &'static str,
    value: &Option<String>,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if let Some(v) = value {
        validate_text(field, v, max_len)?;
    }
    Ok(())
}

/// Free-form text may be empty but is still bounded.
pub fn validate_free_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

pub fn validate_email(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    validate_text(field, value, TEXT_MAX_LEN)?;
    let v = value.trim();
    let Some((local, domain)) = v.split_once('@') else {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must contain '@'",
        });
    };
    if local.is_empty() || domain.is_empty() || v.contains(char::is_whitespace) {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be a valid email address",
        });
    }
    Ok(())
}

pub fn validate_date(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    if parse_record_date(value).is_none() {
        return Err(ContractViolation::InvalidDate {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub fn validate_opt_date(field: &'static str, value: &Option<String>) -> Result<(), ContractViolation> {
    if let Some(v) = value {
        validate_date(field, v)?;
    }
    Ok(())
}

/// Parses a record date. Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive
/// `YYYY-MM-DDTHH:MM:SS` timestamps; the time part is dropped.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|ts| ts.date())
}

/// Serde helper for `Option<Option<T>>` patch fields: absent stays `None`,
/// an explicit `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Normalized form used for email uniqueness checks.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
