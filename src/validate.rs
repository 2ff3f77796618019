// validate.rs
//
// Field-level request validation. Handlers collect `FieldIssue`s and reject
// the request with a single structured 400 when any are present.
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::BlockInput;

pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 480;

#[derive(Debug, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldIssue {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn duration_in_range(minutes: i64) -> bool {
    (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes)
}

pub fn hour_of_day(value: i64) -> bool {
    (0..=23).contains(&value)
}

/// Syntactic email check: one `@`, a non-empty local part and a domain with
/// a dot, no whitespace. Deliverability is not this backend's concern.
pub fn valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Calendar dates travel as `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse a batch of availability blocks. Any failure poisons the whole
/// batch: the caller gets issues for every bad block and inserts nothing.
pub fn parse_blocks(
    blocks: &[BlockInput],
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, Vec<FieldIssue>> {
    let mut issues = Vec::new();
    let mut parsed = Vec::with_capacity(blocks.len());

    if blocks.is_empty() {
        issues.push(FieldIssue::new("blocks", "at least one block is required"));
    }

    for (i, block) in blocks.iter().enumerate() {
        let start = parse_instant(&block.start);
        let end = parse_instant(&block.end);
        if start.is_none() {
            issues.push(FieldIssue::new(
                format!("blocks[{i}].start"),
                "must be an RFC 3339 timestamp",
            ));
        }
        if end.is_none() {
            issues.push(FieldIssue::new(
                format!("blocks[{i}].end"),
                "must be an RFC 3339 timestamp",
            ));
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                issues.push(FieldIssue::new(
                    format!("blocks[{i}].end"),
                    "must be strictly after start",
                ));
            } else {
                parsed.push((start, end));
            }
        }
    }

    if issues.is_empty() {
        Ok(parsed)
    } else {
        Err(issues)
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start: &str, end: &str) -> BlockInput {
        BlockInput {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        assert!(duration_in_range(15));
        assert!(duration_in_range(480));
        assert!(!duration_in_range(14));
        assert!(!duration_in_range(481));
    }

    #[test]
    fn email_syntax() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("first.last@sub.example.org"));
        assert!(!valid_email("no-at-sign"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("a@"));
        assert!(!valid_email("a@nodot"));
        assert!(!valid_email("a b@example.com"));
        assert!(!valid_email("a@.example.com"));
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_date("2026-08-06").is_some());
        assert!(parse_date("06/08/2026").is_none());
        assert!(parse_date("2026-13-01").is_none());
    }

    #[test]
    fn block_batch_parses_when_all_valid() {
        let parsed = parse_blocks(&[
            block("2026-08-06T10:00:00Z", "2026-08-06T11:00:00Z"),
            block("2026-08-06T12:00:00+02:00", "2026-08-06T13:00:00+02:00"),
        ])
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|(s, e)| e > s));
    }

    #[test]
    fn one_bad_block_rejects_the_whole_batch() {
        let err = parse_blocks(&[
            block("2026-08-06T10:00:00Z", "2026-08-06T11:00:00Z"),
            block("2026-08-06T11:00:00Z", "2026-08-06T11:00:00Z"),
        ])
        .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].field, "blocks[1].end");
    }

    #[test]
    fn unparseable_dates_are_reported_per_field() {
        let err = parse_blocks(&[block("tomorrow-ish", "2026-08-06T11:00:00Z")]).unwrap_err();
        assert_eq!(err[0].field, "blocks[0].start");
    }

    #[test]
    fn empty_batch_is_an_issue() {
        assert!(parse_blocks(&[]).is_err());
    }
}
