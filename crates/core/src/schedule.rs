//! Schedule expressions and keys.
//!
//! An alarm fires at one or more points in time, each described by either an
//! absolute date (`at(...)`) or a recurring cron expression (`cron(...)`).
//! Every expression becomes one remote schedule named by a [`ScheduleKey`].

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Accepted layouts for absolute dates, most precise first.
const AT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Layout the remote scheduler expects inside `at(...)`.
const AT_REMOTE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const CRON_FIELD_NAMES: [&str; 6] = [
    "minutes",
    "hours",
    "day-of-month",
    "month",
    "day-of-week",
    "year",
];

// ── Keys ─────────────────────────────────────────────────────────

/// Opaque identifier of one remote schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleKey(String);

impl ScheduleKey {
    /// Generate a fresh, globally unique key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ScheduleKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ScheduleKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Expressions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// One-off firing at an absolute date.
    At,
    /// Recurring firing described by a six-field cron expression.
    Cron,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::At => "at",
            ScheduleKind::Cron => "cron",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-supplied firing time, kept exactly as the user wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleExpression {
    pub kind: ScheduleKind,
    pub value: String,
}

impl ScheduleExpression {
    pub fn at(value: impl Into<String>) -> Self {
        Self { kind: ScheduleKind::At, value: value.into() }
    }

    pub fn cron(value: impl Into<String>) -> Self {
        Self { kind: ScheduleKind::Cron, value: value.into() }
    }

    /// Check the expression's syntax without resolving it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.kind {
            ScheduleKind::At => parse_at(&self.value).map(|_| ()),
            ScheduleKind::Cron => validate_cron(&self.value),
        }
    }

    /// Render as the remote scheduler's expression, e.g. `cron(0 10 * * ? *)`.
    pub fn render(&self) -> Result<String, ValidationError> {
        match self.kind {
            ScheduleKind::At => {
                let at = parse_at(&self.value)?;
                Ok(format!("at({})", at.format(AT_REMOTE_FORMAT)))
            }
            ScheduleKind::Cron => {
                validate_cron(&self.value)?;
                Ok(format!("cron({})", self.value.split_whitespace().collect::<Vec<_>>().join(" ")))
            }
        }
    }
}

fn parse_at(value: &str) -> Result<NaiveDateTime, ValidationError> {
    let trimmed = value.trim();
    AT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidDate(value.to_string()))
}

/// Validate a 6-field cron expression (minutes hours day-of-month month day-of-week year).
/// Accepts digits, three-letter names and the tokens `* ? , - / L W #`.
fn validate_cron(expr: &str) -> Result<(), ValidationError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != CRON_FIELD_NAMES.len() {
        return Err(ValidationError::InvalidCron {
            expression: expr.to_string(),
            reason: format!("expected 6 fields, got {}", fields.len()),
        });
    }
    for (i, field) in fields.iter().enumerate() {
        if !is_valid_cron_field(field) {
            return Err(ValidationError::InvalidCron {
                expression: expr.to_string(),
                reason: format!("invalid {} field '{}'", CRON_FIELD_NAMES[i], field),
            });
        }
    }
    Ok(())
}

fn is_valid_cron_field(field: &str) -> bool {
    !field.is_empty()
        && field.split(',').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | '?' | '-' | '/' | '#'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_accepts_minute_and_second_precision() {
        assert!(ScheduleExpression::at("2030-12-04T12:12").validate().is_ok());
        assert!(ScheduleExpression::at("2030-12-04T12:12:30").validate().is_ok());
        assert!(ScheduleExpression::at("04.12.2030 12:12").validate().is_err());
    }

    #[test]
    fn at_renders_with_seconds() {
        let rendered = ScheduleExpression::at("2030-12-04T12:12").render().unwrap();
        assert_eq!(rendered, "at(2030-12-04T12:12:00)");
    }

    #[test]
    fn cron_needs_six_fields() {
        assert!(ScheduleExpression::cron("0 10 4 10 ? 2030").validate().is_ok());
        assert!(ScheduleExpression::cron("0 10 ? * MON-FRI *").validate().is_ok());
        assert!(ScheduleExpression::cron("0 8 L * ? *").validate().is_ok());

        let err = ScheduleExpression::cron("0 10 4 10 *").validate().unwrap_err();
        assert!(err.to_string().contains("expected 6 fields, got 5"));
    }

    #[test]
    fn cron_rejects_foreign_characters() {
        let err = ScheduleExpression::cron("0 10 4 10 ? 20$0").validate().unwrap_err();
        assert!(err.to_string().contains("year"));
    }

    #[test]
    fn cron_render_collapses_whitespace() {
        let rendered = ScheduleExpression::cron("0  10 * *   ? *").render().unwrap();
        assert_eq!(rendered, "cron(0 10 * * ? *)");
    }

    #[test]
    fn generated_keys_are_unique() {
        let a = ScheduleKey::generate();
        let b = ScheduleKey::generate();
        assert_ne!(a, b);
    }
}
