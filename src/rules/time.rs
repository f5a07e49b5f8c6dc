//! ISO 8601 date/time rules (chrono).
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::descriptor::Verdict;
use crate::error::ProviderError;

type Checked = Result<Verdict, ProviderError>;

const DATE: &str = "%Y-%m-%d";
const TIMES: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const LOCAL_DATE_TIMES: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn date(s: &str) -> bool {
    // chrono accepts unpadded fields; ISO 8601 doesn't
    s.len() == 10 && NaiveDate::parse_from_str(s, DATE).is_ok()
}

fn time(s: &str) -> bool {
    TIMES.iter().any(|fmt| NaiveTime::parse_from_str(s, fmt).is_ok())
}

fn zonal(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}

fn local(s: &str) -> bool {
    LOCAL_DATE_TIMES
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
}

pub fn date_iso8601(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.as_str().is_some_and(date).into())
}

pub fn time_iso8601(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.as_str().is_some_and(time).into())
}

/// Local or zoned date-time.
pub fn date_time_iso8601(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.as_str().is_some_and(|s| zonal(s) || local(s)).into())
}

/// Date-time carrying a UTC offset or `Z`.
pub fn date_time_iso8601_zonal(subject: &Value, _: &[Value]) -> Checked {
    Ok(subject.as_str().is_some_and(zonal).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(f: fn(&Value, &[Value]) -> Checked, v: Value) -> bool {
        f(&v, &[]).unwrap().passed()
    }

    #[test]
    fn dates() {
        assert!(run(date_iso8601, json!("2024-02-29")));
        assert!(!run(date_iso8601, json!("2023-02-29")));
        assert!(!run(date_iso8601, json!("2024-2-9")));
    }

    #[test]
    fn times() {
        assert!(run(time_iso8601, json!("23:59:59")));
        assert!(run(time_iso8601, json!("23:59:59.125")));
        assert!(run(time_iso8601, json!("07:30")));
        assert!(!run(time_iso8601, json!("24:00:01")));
    }

    #[test]
    fn date_times() {
        assert!(run(date_time_iso8601, json!("2024-05-01T10:00:00")));
        assert!(run(date_time_iso8601, json!("2024-05-01T10:00:00Z")));
        assert!(!run(date_time_iso8601_zonal, json!("2024-05-01T10:00:00")));
        assert!(run(date_time_iso8601_zonal, json!("2024-05-01T10:00:00.5+02:00")));
    }
}
