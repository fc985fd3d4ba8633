use std::cmp::min;

use chrono::{DateTime, Duration, TimeZone};
use now::DateTimeNow;

use crate::{storage::entities::Settings, utils::time::next_day_start};

/// Computes when the next reminder should be shown.
///
/// Reminders are placed on a grid that starts at local midnight and advances by the configured
/// interval. The result is the first grid point strictly after `now`. Midnight always restarts the
/// grid, so an interval that doesn't divide a day evenly never pushes a reminder past the next
/// midnight. Returns `None` when reminders are disabled.
pub fn next_notification<Tz: TimeZone>(settings: &Settings, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let interval_ms = Duration::minutes(settings.reminder_interval()? as i64).num_milliseconds();

    let day_start = now.clone().beginning_of_day();
    let elapsed_ms = (now.clone() - day_start.clone()).num_milliseconds();
    let steps = elapsed_ms / interval_ms + 1;
    let candidate = day_start + Duration::milliseconds(interval_ms * steps);

    Some(min(candidate, next_day_start(now)))
}
