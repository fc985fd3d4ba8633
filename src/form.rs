//! The activity form. Fields are kept as raw text, the way they are typed, and only turned into
//! an [ActivityDraft] on submission.

use std::fmt::Display;

use chrono::{NaiveDate, NaiveTime};
use chrono_english::{parse_date_string, Dialect};
use thiserror::Error;
use tracing::debug;

use crate::{storage::entities::ActivityDraft, utils::time::iso_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormField {
    Name,
    Duration,
    Description,
    Date,
}

impl Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormField::Name => write!(f, "name"),
            FormField::Duration => write!(f, "duration"),
            FormField::Description => write!(f, "description"),
            FormField::Date => write!(f, "date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

/// Every field that failed validation, in field order. At most one error per field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Activity form is invalid: {}", describe(.0))]
pub struct FormErrors(pub Vec<FieldError>);

impl FormErrors {
    pub fn get(&self, field: FormField) -> Option<&'static str> {
        self.0.iter().find(|v| v.field == field).map(|v| v.message)
    }
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

pub const NAME_REQUIRED: &str = "Activity name is required";
pub const DURATION_REQUIRED: &str = "Duration is required";
pub const DURATION_NOT_A_NUMBER: &str = "Duration must be a whole number of minutes";
pub const DURATION_TOO_SHORT: &str = "Duration must be at least 1 minute";
pub const DATE_REQUIRED: &str = "Date is required";
pub const DATE_INVALID: &str = "Date is not valid";

/// Form for logging a single activity. The date field defaults to a date chosen in the calendar or
/// to today.
#[derive(Debug, Clone)]
pub struct ActivityForm {
    name: String,
    duration: String,
    description: String,
    date: String,
    default_date: NaiveDate,
    today: NaiveDate,
}

impl ActivityForm {
    pub fn new(date: Option<NaiveDate>, today: NaiveDate) -> Self {
        let default_date = date.unwrap_or(today);
        Self {
            name: String::new(),
            duration: String::new(),
            description: String::new(),
            date: iso_date(default_date),
            default_date,
            today,
        }
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.name = value.into();
    }

    pub fn set_duration(&mut self, value: impl Into<String>) {
        self.duration = value.into();
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        self.description = value.into();
    }

    pub fn set_date(&mut self, value: impl Into<String>) {
        self.date = value.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> &str {
        &self.duration
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn default_date(&self) -> NaiveDate {
        self.default_date
    }

    /// Validates the form. On success passes the draft to `on_submit` and resets the fields.
    /// On failure the fields are kept so that they can be corrected.
    pub fn submit(&mut self, on_submit: impl FnOnce(ActivityDraft)) -> Result<(), FormErrors> {
        let draft = self.validate()?;
        debug!("Submitting activity {:?}", draft);
        on_submit(draft);
        self.reset();
        Ok(())
    }

    pub fn validate(&self) -> Result<ActivityDraft, FormErrors> {
        let mut errors = vec![];

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError {
                field: FormField::Name,
                message: NAME_REQUIRED,
            });
        }

        let duration = match parse_duration(&self.duration) {
            Ok(v) => Some(v),
            Err(message) => {
                errors.push(FieldError {
                    field: FormField::Duration,
                    message,
                });
                None
            }
        };

        let date = match parse_date(&self.date, self.today) {
            Ok(v) => Some(v),
            Err(message) => {
                errors.push(FieldError {
                    field: FormField::Date,
                    message,
                });
                None
            }
        };

        match (duration, date) {
            (Some(duration), Some(date)) if errors.is_empty() => Ok(ActivityDraft {
                name: name.to_string(),
                duration,
                description: self.description.clone(),
                date,
            }),
            _ => Err(FormErrors(errors)),
        }
    }

    pub fn reset(&mut self) {
        self.name.clear();
        self.duration.clear();
        self.description.clear();
        self.date = iso_date(self.default_date);
    }
}

fn parse_duration(value: &str) -> Result<u32, &'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DURATION_REQUIRED);
    }
    match value.parse::<i64>() {
        Ok(v) if v < 1 => Err(DURATION_TOO_SHORT),
        Ok(v) => u32::try_from(v).map_err(|_| DURATION_NOT_A_NUMBER),
        Err(_) => Err(DURATION_NOT_A_NUMBER),
    }
}

/// Accepts `YYYY-MM-DD` and phrases like "yesterday" or "3 days ago".
pub fn parse_date(value: &str, today: NaiveDate) -> Result<NaiveDate, &'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DATE_REQUIRED);
    }
    if let Ok(v) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(v);
    }
    let reference = today.and_time(NaiveTime::MIN).and_utc();
    parse_date_string(value, reference, Dialect::Uk)
        .map(|v| v.date_naive())
        .map_err(|_| DATE_INVALID)
}
