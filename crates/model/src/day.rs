use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone as _, Utc};

/// Midnight of the given local date, as the stored Utc instant.
pub fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap();
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

/// The local calendar date of a stored instant.
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

/// Whole local days from `today` to `instant`. Time of day is dropped on
/// both sides, so "tomorrow" is always 1 no matter when the sweep runs.
pub fn days_until(instant: DateTime<Utc>, today: NaiveDate) -> i64 {
    local_date(instant).signed_duration_since(today).num_days()
}

pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date + Duration::days(days as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_until_drops_time_of_day() {
        let due = local_midnight(date(2024, 10, 4)) + Duration::hours(15);
        assert_eq!(3, days_until(due, date(2024, 10, 1)));
        assert_eq!(0, days_until(due, date(2024, 10, 4)));
        assert_eq!(-2, days_until(due, date(2024, 10, 6)));
    }

    #[test]
    fn test_add_days() {
        assert_eq!(date(2024, 3, 2), add_days(date(2024, 2, 1), 30));
        assert_eq!(date(2025, 1, 9), add_days(date(2024, 12, 10), 30));
    }

    #[test]
    fn test_local_midnight_round_trip() {
        let day = date(2024, 7, 15);
        assert_eq!(
            day,
            local_midnight(day).with_timezone(&Local).date_naive()
        );
    }
}
