//! Application records and the values they are keyed by.
//!
//! These types are shared by the server (which persists them) and by
//! clients (which submit and read them back), so the wire format lives in
//! exactly one place.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// `chrono` format string for a day key.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// One applicant's submission as it is stored on disk.
///
/// Field order matters for the on-disk layout: `timestamp` comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub timestamp: String,
    pub name: String,
    pub grade: String,
    pub introduction: String,
}

impl ApplicationRecord {
    pub fn new(timestamp: impl Into<String>, fields: ApplicationFields) -> Self {
        Self {
            timestamp: timestamp.into(),
            name: fields.name,
            grade: fields.grade,
            introduction: fields.introduction,
        }
    }

    /// Parse the timestamp as an instant, if it is valid RFC 3339.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// The three applicant-supplied fields of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFields {
    pub name: String,
    pub grade: String,
    pub introduction: String,
}

impl ApplicationFields {
    pub fn new(
        name: impl Into<String>,
        grade: impl Into<String>,
        introduction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            grade: grade.into(),
            introduction: introduction.into(),
        }
    }

    /// The first field that is empty, in form order.
    pub fn first_missing(&self) -> Option<FormField> {
        if self.name.is_empty() {
            Some(FormField::Name)
        } else if self.grade.is_empty() {
            Some(FormField::Grade)
        } else if self.introduction.is_empty() {
            Some(FormField::Introduction)
        } else {
            None
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Grade => &self.grade,
            FormField::Introduction => &self.introduction,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::Name => &mut self.name,
            FormField::Grade => &mut self.grade,
            FormField::Introduction => &mut self.introduction,
        };
        *slot = value.into();
    }
}

/// Names of the form fields, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Name,
    Grade,
    Introduction,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Name, FormField::Grade, FormField::Introduction];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Grade => "grade",
            FormField::Introduction => "introduction",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body of `POST /api/applications`.
///
/// Every field is optional on the wire so that a missing field is reported
/// as a validation failure rather than a malformed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
}

impl SubmissionInput {
    /// Validate presence of all three fields.
    ///
    /// Absent and empty values are both rejected; no other format checks are made.
    pub fn into_fields(self) -> Result<ApplicationFields, FormField> {
        let fields = ApplicationFields {
            name: self.name.unwrap_or_default(),
            grade: self.grade.unwrap_or_default(),
            introduction: self.introduction.unwrap_or_default(),
        };
        match fields.first_missing() {
            Some(field) => Err(field),
            None => Ok(fields),
        }
    }
}

impl From<ApplicationFields> for SubmissionInput {
    fn from(fields: ApplicationFields) -> Self {
        Self {
            name: Some(fields.name),
            grade: Some(fields.grade),
            introduction: Some(fields.introduction),
        }
    }
}

/// Successful response of `POST /api/applications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub timestamp: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Class-year labels offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    First,
    Second,
    Third,
    Fourth,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::First, Grade::Second, Grade::Third, Grade::Fourth];

    pub fn label(&self) -> &'static str {
        match self {
            Grade::First => "大一",
            Grade::Second => "大二",
            Grade::Third => "大三",
            Grade::Fourth => "大四",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown grade {0:?}")]
pub struct UnknownGrade(pub String);

impl FromStr for Grade {
    type Err = UnknownGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|grade| grade.label() == s)
            .ok_or_else(|| UnknownGrade(s.to_string()))
    }
}

/// Calendar day that identifies a partition, rendered `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl From<DateTime<Utc>> for DayKey {
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid day key {0:?}, expected YYYY-MM-DD")]
pub struct DayKeyError(pub String);

impl FromStr for DayKey {
    type Err = DayKeyError;

    /// Only the canonical zero-padded form is accepted, so a key always
    /// round-trips to the same file name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s, DAY_KEY_FORMAT)
            .map_err(|_| DayKeyError(s.to_string()))?;
        let key = DayKey(date);
        if key.to_string() != s {
            return Err(DayKeyError(s.to_string()));
        }
        Ok(key)
    }
}

/// Render an instant the way records store it: UTC, millisecond precision, `Z` suffix.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
