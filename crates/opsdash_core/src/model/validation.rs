//! Record validation errors shared by all record kinds.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Boundary validation failure for a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Record identifiers must not be the nil UUID.
    NilId,
    /// Required text field is blank.
    EmptyField(&'static str),
    /// Numeric field is NaN or infinite.
    NonFinite(&'static str),
    /// Numeric field must be >= 0.
    Negative { field: &'static str, value: f64 },
    /// Numeric field must be > 0.
    NotPositive { field: &'static str, value: f64 },
    /// Numeric field must lie within `[min, max]`.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// `end` must not be earlier than `start`.
    InvalidDateWindow { start: NaiveDate, end: NaiveDate },
    /// Skill names must be non-empty and free of list separators.
    InvalidSkill(String),
    /// Free-form role text that names a known role or carries padding.
    NonCanonicalRole(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "record id must not be nil"),
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::NonFinite(field) => write!(f, "{field} must be a finite number"),
            Self::Negative { field, value } => {
                write!(f, "{field} must be >= 0, got {value}")
            }
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be > 0, got {value}")
            }
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} must be within [{min}, {max}], got {value}"),
            Self::InvalidDateWindow { start, end } => {
                write!(f, "end date ({end}) must be >= start date ({start})")
            }
            Self::InvalidSkill(skill) => write!(f, "invalid skill `{skill}`"),
            Self::NonCanonicalRole(role) => {
                write!(f, "role `{role}` is not in canonical form")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

pub(crate) fn require_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub(crate) fn require_date_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::InvalidDateWindow { start, end });
        }
    }
    Ok(())
}
