//! # Error Types
//!
//! Domain-specific error types for tablebook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tablebook-core errors (this file)                                     │
//! │  ├── ValidationError   - One rule violation (DateInPast, SlotConflict) │
//! │  ├── FieldError        - A violation pinned to a field name            │
//! │  └── ValidationErrors  - Every violation found in one pass             │
//! │                                                                         │
//! │  tablebook-db errors (separate crate)                                  │
//! │  └── DbError           - NotFound, store failures, wraps the above     │
//! │                                                                         │
//! │  Flow: ValidationError → ValidationErrors → DbError → web layer        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (table number, date, time)
//! 3. Rules never short-circuit: every failing field is reported at once
//! 4. Each error variant maps to a user-facing message

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// A single rule violation.
///
/// The field the violation belongs to is carried by [`FieldError`], so the
/// same kind can be reported against different fields (`OwnershipMismatch`
/// on both `customer` and `table`, for example).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("this field is required")]
    Required,

    /// Field value is too short.
    #[error("must be at least {min} characters")]
    TooShort { min: usize },

    /// Field value is too long.
    #[error("must be at most {max} characters")]
    TooLong { max: usize },

    /// Numeric value is out of range.
    #[error("must be between {min} and {max}")]
    OutOfRange { min: i64, max: i64 },

    /// Value must be positive.
    #[error("must be greater than 0")]
    MustBePositive,

    /// Invalid format (email, phone).
    #[error("invalid format: {reason}")]
    InvalidFormat { reason: String },

    /// Another record of the same owner already uses this value.
    #[error("'{value}' already exists")]
    UniquenessViolation { value: String },

    /// Reservation date lies before today.
    #[error("reservations cannot be made for past dates")]
    DateInPast,

    /// Reservation date lies beyond the booking horizon.
    #[error("reservations cannot be made more than {max_days} days in advance")]
    DateTooFar { max_days: u32 },

    /// Reservation time lies outside opening hours.
    #[error("opening hours are {opening_hour}:00 to {closing_hour}:00")]
    OutOfBusinessHours { opening_hour: u32, closing_hour: u32 },

    /// Reservation time is not on a slot boundary.
    #[error("reservations are only accepted every {slot_minutes} minutes")]
    InvalidTimeGranularity { slot_minutes: u32 },

    /// Referenced customer or table belongs to another owner.
    #[error("customer and table must belong to the same owner as the reservation")]
    OwnershipMismatch,

    /// The (table, date, time) slot is held by another reservation.
    #[error("table {table_number} is already reserved for {date} at {}", .time.format("%H:%M"))]
    SlotConflict {
        table_number: u32,
        date: NaiveDate,
        time: NaiveTime,
    },
}

impl ValidationError {
    /// Stable machine-readable code for the web layer.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Required => "required",
            ValidationError::TooShort { .. } => "too_short",
            ValidationError::TooLong { .. } => "too_long",
            ValidationError::OutOfRange { .. } => "out_of_range",
            ValidationError::MustBePositive => "must_be_positive",
            ValidationError::InvalidFormat { .. } => "invalid_format",
            ValidationError::UniquenessViolation { .. } => "uniqueness_violation",
            ValidationError::DateInPast => "date_in_past",
            ValidationError::DateTooFar { .. } => "date_too_far",
            ValidationError::OutOfBusinessHours { .. } => "out_of_business_hours",
            ValidationError::InvalidTimeGranularity { .. } => "invalid_time_granularity",
            ValidationError::OwnershipMismatch => "ownership_mismatch",
            ValidationError::SlotConflict { .. } => "slot_conflict",
        }
    }
}

// =============================================================================
// Field Error
// =============================================================================

/// A violation attached to the input field it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {error}")]
pub struct FieldError {
    pub field: String,
    pub error: ValidationError,
}

/// Serialized shape handed to the web layer: `{ field, code, message }`.
impl Serialize for FieldError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("FieldError", 3)?;
        state.serialize_field("field", &self.field)?;
        state.serialize_field("code", self.error.code())?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Every violation collected by one validation pass.
///
/// ## Collecting, Not Short-Circuiting
/// ```text
/// date rule ──► DateInPast            ─┐
/// time rule ──► OutOfBusinessHours    ─┼──► ValidationErrors [3 entries]
/// ownership ──► OwnershipMismatch     ─┘
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        ValidationErrors::default()
    }

    /// Creates a collection holding one violation.
    pub fn single(field: impl Into<String>, error: ValidationError) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, error);
        errors
    }

    /// Records a violation against `field`.
    pub fn push(&mut self, field: impl Into<String>, error: ValidationError) {
        self.errors.push(FieldError {
            field: field.into(),
            error,
        });
    }

    /// Records the outcome of a rule, keeping the value when it passed.
    pub fn check<T>(&mut self, field: &str, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.push(field, error);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Violations recorded against one field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| &e.error)
    }

    /// Whether any violation satisfies `predicate`.
    pub fn contains(&self, predicate: impl Fn(&ValidationError) -> bool) -> bool {
        self.errors.iter().any(|e| predicate(&e.error))
    }

    /// Human-readable messages keyed by field name.
    pub fn messages(&self) -> BTreeMap<String, Vec<String>> {
        let mut by_field: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for e in &self.errors {
            by_field
                .entry(e.field.clone())
                .or_default()
                .push(e.error.to_string());
        }
        by_field
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result of a single-field rule.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
