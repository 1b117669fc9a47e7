//! Wall-clock helpers shared by the calculator, the timer and the automator.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike};

const QUARTER_HOUR_SECS: i64 = 15 * 60;

/// The Monday of the week containing `date` (Monday maps to itself).
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(days_from_monday)
}

/// Round down to the quarter-hour boundary at or before `t`, dropping sub-second precision.
pub fn round_down_to_quarter_hour<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    let secs_into_hour = (t.minute() as i64) * 60 + t.second() as i64;
    let excess = secs_into_hour % QUARTER_HOUR_SECS;
    truncate_subsec(t) - Duration::seconds(excess)
}

/// Round to the nearest quarter-hour boundary; exact halves round up.
pub fn nearest_quarter_hour<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    let floor = round_down_to_quarter_hour(t);
    let into_quarter = t.clone() - floor.clone();
    if into_quarter >= Duration::seconds(QUARTER_HOUR_SECS / 2) {
        floor + Duration::seconds(QUARTER_HOUR_SECS)
    } else {
        floor
    }
}

/// Milliseconds until the next whole clock second; zero when already on a boundary.
pub fn millis_to_next_second<Tz: TimeZone>(t: &DateTime<Tz>) -> u64 {
    let millis = (t.timestamp_subsec_millis() % 1000) as u64;
    if millis == 0 {
        0
    } else {
        1000 - millis
    }
}

/// Convert a floating-point number of seconds into a millisecond-precision duration.
pub fn duration_from_secs_f64(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// Seconds (with millisecond precision) held by `duration`.
pub fn duration_secs_f64(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

fn truncate_subsec<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    t.clone() - Duration::nanoseconds(t.nanosecond() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Utc, Weekday};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 7, h, m, s).unwrap()
    }

    #[test]
    fn monday_is_idempotent() {
        let monday = NaiveDate::from_ymd_opt(2019, 1, 7).unwrap();
        assert_eq!(monday.weekday(), Weekday::Mon);
        assert_eq!(monday_of(monday), monday);
        assert_eq!(monday_of(monday_of(monday)), monday);
    }

    #[test]
    fn other_weekdays_shift_back_to_monday() {
        let monday = NaiveDate::from_ymd_opt(2019, 1, 7).unwrap();
        for offset in 1..7 {
            let day = monday + Duration::days(offset);
            assert_eq!(monday_of(day), monday, "{day}");
        }
    }

    #[test]
    fn nearest_quarter_rounds_up_and_down() {
        let base = at(19, 0, 0);
        assert_eq!(nearest_quarter_hour(&(base + Duration::minutes(11))), at(19, 15, 0));
        assert_eq!(nearest_quarter_hour(&(base + Duration::minutes(5))), base);
        assert_eq!(nearest_quarter_hour(&base), base);
    }

    #[test]
    fn round_down_stays_on_boundary() {
        assert_eq!(round_down_to_quarter_hour(&at(19, 14, 59)), at(19, 0, 0));
        assert_eq!(round_down_to_quarter_hour(&at(19, 15, 0)), at(19, 15, 0));
        let with_millis = at(19, 31, 2) + Duration::milliseconds(250);
        assert_eq!(round_down_to_quarter_hour(&with_millis), at(19, 30, 0));
    }

    #[test]
    fn millis_to_next_second_aligns() {
        assert_eq!(millis_to_next_second(&at(19, 0, 0)), 0);
        let t = at(19, 0, 0) + Duration::milliseconds(300);
        assert_eq!(millis_to_next_second(&t), 700);
    }
}
