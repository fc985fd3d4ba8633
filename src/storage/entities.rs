use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

/// A logged activity as it is stored in the `activities` document. Activities are never edited
/// after creation.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Activity {
    /// Creation time in milliseconds. Unique within a session.
    pub id: i64,
    pub name: String,
    /// Duration in minutes.
    pub duration: u32,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
}

impl Activity {
    pub fn from_draft(id: i64, draft: ActivityDraft) -> Self {
        let ActivityDraft {
            name,
            duration,
            description,
            date,
        } = draft;
        Self {
            id,
            name,
            duration,
            description,
            date,
        }
    }
}

/// Validated output of the activity form. Becomes an [Activity] once it receives an id.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ActivityDraft {
    pub name: String,
    pub duration: u32,
    pub description: String,
    pub date: NaiveDate,
}

/// User settings stored under `userSettings`. Written by `day2day settings`, only read by the
/// dashboard.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Reminder interval in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}

impl Settings {
    pub fn with_interval(interval: u32) -> Self {
        Self {
            interval: Some(interval),
        }
    }

    /// Interval of reminders. Zero is treated the same way as a missing interval.
    pub fn reminder_interval(&self) -> Option<u32> {
        self.interval.filter(|v| *v > 0)
    }
}
