//! The advisory flows, one module per domain.
//!
//! Each module declares its typed input and output records, the schemas
//! that validate them, and the prompt template for its domain, and hangs
//! its orchestration method off [`crate::engine::AdvisoryEngine`]. Every
//! flow is the same composition: validate input, render the prompt, invoke
//! the backend, validate and decode the reply.

pub mod assistant;
pub mod credit;
pub mod crop_image;
pub mod field_health;
pub mod harvest;
pub mod market;
pub mod news;
pub mod schemes;
pub mod watering;
pub mod weather;

use chrono::NaiveDate;

/// Today's date as stamped into prompts, e.g. "Friday, August 7, 2026".
pub(crate) fn today_stamp() -> String {
    chrono::Local::now().format("%A, %B %-d, %Y").to_string()
}

/// Whole days elapsed between a planting date and today, floored.
pub(crate) fn days_between(planting: NaiveDate, today: NaiveDate) -> i64 {
    (today - planting).num_days()
}

/// Accepts plain ISO dates and full RFC 3339 timestamps.
pub(crate) fn parse_planting_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|stamp| stamp.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_between_floors_whole_days() {
        let planting = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();
        assert_eq!(days_between(planting, today), 10);
        assert_eq!(days_between(planting, planting), 0);
    }

    #[test]
    fn planting_date_parses_both_forms() {
        assert_eq!(
            parse_planting_date("2024-06-01"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert_eq!(
            parse_planting_date("2024-06-01T08:30:00+05:30"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert!(parse_planting_date("June first").is_none());
    }
}
