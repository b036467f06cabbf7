//! Date-window predicate and rule date parsing.

use super::{EvalContext, Predicate};
use crate::error::BadgeError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::trace;

const NAIVE_FORMATS: &[&str] =
    &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parses the ISO-like timestamps the badge endpoint emits.
///
/// Accepts RFC 3339, offset-less date-times and bare dates. Values without an
/// offset are read as UTC; bare dates mean midnight.
pub fn parse_rule_date(value: &str) -> Result<DateTime<Utc>, BadgeError> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(BadgeError::InvalidDate { value: value.to_string() })
}

/// Rejects before `start` and after `end`. Both bounds are inclusive.
pub struct SchedulePredicate {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl SchedulePredicate {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Builds the window from raw rule strings. Unparseable bounds are dropped.
    pub fn from_rule_dates(start: Option<&str>, end: Option<&str>) -> Self {
        let parse = |value: Option<&str>| {
            value.filter(|v| !v.trim().is_empty()).and_then(|v| match parse_rule_date(v) {
                Ok(date) => Some(date),
                Err(e) => {
                    trace!("Ignoring {}", e);
                    None
                }
            })
        };
        Self::new(parse(start), parse(end))
    }
}

impl Predicate for SchedulePredicate {
    fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        if let Some(start) = self.start {
            if start > ctx.now {
                return false;
            }
        }

        if let Some(end) = self.end {
            if end < ctx.now {
                return false;
            }
        }

        true
    }

    fn description(&self) -> String {
        let fmt = |d: DateTime<Utc>| d.format("%Y-%m-%d %H:%M UTC").to_string();
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("Schedule: {} - {}", fmt(start), fmt(end)),
            (Some(start), None) => format!("Schedule: from {}", fmt(start)),
            (None, Some(end)) => format!("Schedule: until {}", fmt(end)),
            (None, None) => "Schedule: any".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::models::{PageType, Product};
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn check(predicate: &SchedulePredicate, now: DateTime<Utc>) -> bool {
        let product = Product { id: "1".into(), ..Default::default() };
        let tags = HashSet::new();
        predicate.matches(&EvalContext { product: &product, tags: &tags, page_type: PageType::Home, now })
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(parse_rule_date("2024-06-01T10:00:00Z").unwrap(), at(2024, 6, 1, 10));
        assert_eq!(parse_rule_date("2024-06-01T10:00:00.000Z").unwrap(), at(2024, 6, 1, 10));
        assert_eq!(parse_rule_date("2024-06-01T12:00:00+02:00").unwrap(), at(2024, 6, 1, 10));
    }

    #[test]
    fn test_parse_naive_forms() {
        assert_eq!(parse_rule_date("2024-06-01T10:00:00").unwrap(), at(2024, 6, 1, 10));
        assert_eq!(parse_rule_date("2024-06-01T10:00").unwrap(), at(2024, 6, 1, 10));
        assert_eq!(parse_rule_date("2024-06-01 10:00:00").unwrap(), at(2024, 6, 1, 10));
        assert_eq!(parse_rule_date(" 2024-06-01 ").unwrap(), at(2024, 6, 1, 0));
    }

    #[test]
    fn test_parse_invalid() {
        let err = parse_rule_date("soon").unwrap_err();
        assert!(matches!(err, BadgeError::InvalidDate { .. }));
    }

    #[test]
    fn test_window() {
        let predicate = SchedulePredicate::new(Some(at(2024, 6, 1, 0)), Some(at(2024, 6, 30, 0)));
        assert!(!check(&predicate, at(2024, 5, 31, 23)));
        assert!(check(&predicate, at(2024, 6, 1, 0)));
        assert!(check(&predicate, at(2024, 6, 15, 12)));
        assert!(check(&predicate, at(2024, 6, 30, 0)));
        assert!(!check(&predicate, at(2024, 6, 30, 1)));
    }

    #[test]
    fn test_open_ended() {
        let starts = SchedulePredicate::new(Some(at(2024, 6, 1, 0)), None);
        assert!(check(&starts, at(2030, 1, 1, 0)));
        assert!(!check(&starts, at(2024, 1, 1, 0)));

        let ends = SchedulePredicate::new(None, Some(at(2024, 6, 1, 0)));
        assert!(check(&ends, at(2020, 1, 1, 0)));
        assert!(!check(&ends, at(2024, 6, 2, 0)));
    }

    #[test]
    fn test_unparseable_bounds_are_not_binding() {
        let predicate = SchedulePredicate::from_rule_dates(Some("whenever"), Some(""));
        assert!(check(&predicate, at(2024, 6, 1, 0)));
        assert_eq!(predicate.description(), "Schedule: any");
    }

    #[test]
    fn test_description() {
        let predicate = SchedulePredicate::from_rule_dates(Some("2024-06-01"), None);
        assert_eq!(predicate.description(), "Schedule: from 2024-06-01 00:00 UTC");
    }
}
