//! Date and time formats used on the wire
//!
//! Dates are `DD/MM/YYYY`, times are 12-hour with no leading zero (`3:04 PM`).

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

/// Date format for requests and responses
pub const DATE_FORMAT: &str = "%d/%m/%Y";

const TIME_FORMAT_OUT: &str = "%-I:%M %p";
const TIME_FORMAT_IN: &str = "%I:%M %p";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT_OUT).to_string()
}

/// Parse a `DD/MM/YYYY` date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Parse a `3:04 PM` style time; the hour may be zero-padded
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT_IN).ok()
}

/// Collapse query string pairs into one value per key; the first one wins
pub fn first_values(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    let mut values = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        values.entry(key).or_insert(value);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_wins() {
        let pairs = vec![
            ("status".to_string(), "ongoing".to_string()),
            ("status".to_string(), "completed".to_string()),
            ("page".to_string(), "2".to_string()),
        ];
        let values = first_values(pairs);
        assert_eq!(values.len(), 2);
        assert_eq!(values["status"], "ongoing");
    }

    #[test]
    fn test_format_time_drops_leading_zero() {
        let time = NaiveTime::from_hms_opt(15, 4, 0).unwrap();
        assert_eq!(format_time(time), "3:04 PM");
        let morning = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(format_time(morning), "9:30 AM");
    }

    #[test]
    fn test_parse_time_accepts_both_hour_widths() {
        let expected = NaiveTime::from_hms_opt(15, 4, 0);
        assert_eq!(parse_time("3:04 PM"), expected);
        assert_eq!(parse_time("03:04 PM"), expected);
        assert_eq!(parse_time("15:04"), None);
    }

    #[test]
    fn test_date_is_day_first() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(format_date(date), "01/02/2024");
        assert_eq!(parse_date("01/02/2024"), Some(date));
        assert_eq!(parse_date("2024-02-01"), None);
        assert_eq!(parse_date("31/02/2024"), None);
    }
}
