//! Weekly view over activities. Holds no state of its own, every calendar is built from the
//! activity list it is given.

use std::fmt::Write;

use ansi_term::Style;
use chrono::{Duration, NaiveDate};

use crate::{
    storage::entities::Activity,
    utils::time::{format_minutes, iso_date, week_start},
};

#[derive(Debug, PartialEq, Eq)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    pub activities: Vec<&'a Activity>,
}

impl CalendarDay<'_> {
    pub fn total_minutes(&self) -> u32 {
        self.activities.iter().map(|v| v.duration).sum()
    }

    fn header(&self) -> String {
        format!("{} {}", self.date.format("%a"), iso_date(self.date))
    }
}

/// Seven days from Monday to Sunday with activities grouped by their date.
#[derive(Debug)]
pub struct WeeklyCalendar<'a> {
    activities: &'a [Activity],
    days: Vec<CalendarDay<'a>>,
}

impl<'a> WeeklyCalendar<'a> {
    /// Creates a calendar for the week that contains `week_of`. Activities keep the order they
    /// have in the list.
    pub fn new(activities: &'a [Activity], week_of: NaiveDate) -> Self {
        let start = week_start(week_of);
        let days = (0..7)
            .map(|offset| {
                let date = start + Duration::days(offset);
                CalendarDay {
                    date,
                    activities: activities.iter().filter(|v| v.date == date).collect(),
                }
            })
            .collect();
        Self { activities, days }
    }

    pub fn start(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn end(&self) -> NaiveDate {
        self.days[6].date
    }

    pub fn days(&self) -> &[CalendarDay<'a>] {
        &self.days
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay<'a>> {
        self.days.iter().find(|v| v.date == date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start() <= date && date <= self.end()
    }

    pub fn previous_week(&self) -> WeeklyCalendar<'a> {
        WeeklyCalendar::new(self.activities, self.start() - Duration::weeks(1))
    }

    pub fn next_week(&self) -> WeeklyCalendar<'a> {
        WeeklyCalendar::new(self.activities, self.start() + Duration::weeks(1))
    }

    pub fn total_minutes(&self) -> u32 {
        self.days.iter().map(CalendarDay::total_minutes).sum()
    }

    /// Asks to add an activity on `date`. Only dates shown by this calendar are accepted.
    pub fn request_add(&self, date: NaiveDate, on_add: impl FnOnce(NaiveDate)) -> bool {
        if !self.contains(date) {
            return false;
        }
        on_add(date);
        true
    }

    /// Renders the calendar as text. With `styled` the header of today is highlighted using
    /// terminal escape codes.
    pub fn render(&self, today: NaiveDate, styled: bool) -> String {
        let mut output = String::new();
        // Writing into a String can't fail.
        let _ = writeln!(
            output,
            "Week {} - {}\t{}",
            iso_date(self.start()),
            iso_date(self.end()),
            format_minutes(self.total_minutes())
        );
        for day in &self.days {
            let marker = if day.date == today { " (today)" } else { "" };
            let header = format!("{}{marker}", day.header());
            let header = if styled && day.date == today {
                Style::new().bold().paint(header).to_string()
            } else {
                header
            };
            let _ = writeln!(output, "{header}\t{}", format_minutes(day.total_minutes()));
            if day.activities.is_empty() {
                let _ = writeln!(output, "  -");
            }
            for activity in &day.activities {
                if activity.description.is_empty() {
                    let _ = writeln!(
                        output,
                        "  {}\t{}",
                        format_minutes(activity.duration),
                        activity.name
                    );
                } else {
                    let _ = writeln!(
                        output,
                        "  {}\t{}\t{}",
                        format_minutes(activity.duration),
                        activity.name,
                        activity.description
                    );
                }
            }
        }
        output
    }
}
