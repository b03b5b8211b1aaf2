//! Wall-clock parsing and formatting helpers shared by the persistence layer
//! and the tool boundary. All times are local `HH:MM`/`HH:MM:SS` strings with
//! no timezone attached.

use chrono::{NaiveDate, NaiveTime};

/// Parses `HH:MM:SS` or `HH:MM`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn fmt_hm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn fmt_hms(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{fmt_hm, fmt_hms, parse_date, parse_time};

    #[test]
    fn accepts_both_time_formats() {
        let expected = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_time("09:30"), Some(expected));
        assert_eq!(parse_time("09:30:00"), Some(expected));
        assert_eq!(parse_time(" 09:30 "), Some(expected));
        assert_eq!(parse_time("9h30"), None);
    }

    #[test]
    fn formats_round_trip() {
        let time = NaiveTime::from_hms_opt(14, 5, 0).unwrap();
        assert_eq!(fmt_hm(time), "14:05");
        assert_eq!(fmt_hms(time), "14:05:00");
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("2025-03-10").is_some());
        assert!(parse_date("10/03/2025").is_none());
        assert!(parse_date("2025-13-01").is_none());
    }
}
