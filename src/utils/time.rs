use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use now::DateTimeNow;

/// This is the standard way of converting a date to a string in day2day.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).beginning_of_day()
}

/// Formats minutes as `1h5m` or `45m`.
pub fn format_minutes(minutes: u32) -> String {
    if minutes >= 60 {
        format!("{}h{}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

/// Returns Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{format_minutes, iso_date, next_day_start, week_start};

    #[test]
    fn test_week_start() {
        // 2024-05-01 is a Wednesday.
        let wednesday = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(week_start(wednesday), NaiveDate::from_ymd_opt(2024, 4, 29).unwrap());
        let monday = NaiveDate::from_ymd_opt(2024, 4, 29).unwrap();
        assert_eq!(week_start(monday), monday);
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        assert_eq!(week_start(sunday), monday);
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(60), "1h0m");
        assert_eq!(format_minutes(95), "1h35m");
    }

    #[test]
    fn test_next_day_start() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 30).unwrap();
        assert_eq!(
            next_day_start(time),
            Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(iso_date(time.date_naive()), "2024-05-01");
    }
}
