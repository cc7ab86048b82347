// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and parsing.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Timestamp component of a reward redemption code.
pub fn format_code_timestamp(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an `MM/DD/YYYY` expiry date as 23:59:59 local time on that day.
///
/// Goals and rewards stay usable through the whole expiry day.
pub fn parse_expiry_date(raw: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y").ok()?;
    let end_of_day = date.and_hms_opt(23, 59, 59)?;
    Local
        .from_local_datetime(&end_of_day)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_expiry_date_end_of_local_day() {
        let expiry = parse_expiry_date("12/31/2030").unwrap();
        let local = expiry.with_timezone(&Local);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2030, 12, 31).unwrap());
        assert_eq!((local.hour(), local.minute(), local.second()), (23, 59, 59));
    }

    #[test]
    fn test_parse_expiry_date_rejects_other_formats() {
        assert!(parse_expiry_date("2030-12-31").is_none());
        assert!(parse_expiry_date("13/01/2030").is_none());
        assert!(parse_expiry_date("").is_none());
    }

    #[test]
    fn test_format_utc_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-01-15T10:30:00Z");
    }
}
