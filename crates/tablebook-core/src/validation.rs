//! # Validation Module
//!
//! Field-level rules for customers, tables and reservations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web layer                                                    │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + booking.rs                                     │
//! │  ├── One pure predicate per field                                      │
//! │  └── Collected into ValidationErrors, never short-circuited            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (owner_id, email), UNIQUE (owner_id, table_number)         │
//! │  ├── Partial UNIQUE (table_id, date, time) WHERE status <> cancelled   │
//! │  └── CHECK (capacity BETWEEN 1 AND 20)                                 │
//! │                                                                         │
//! │  Layer 3 catches what Layer 2 raced against                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tablebook_core::validation::{validate_capacity, validate_email};
//!
//! assert_eq!(validate_email(" Ana@Example.com ").unwrap(), "ana@example.com");
//! assert!(validate_capacity(21).is_err());
//! ```

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use validator::ValidateEmail;

use crate::error::{ValidationError, ValidationErrors, ValidationResult};
use crate::policy::BookingPolicy;
use crate::types::{CustomerUpdate, NewCustomer, NewTable, TableUpdate};
use crate::{
    MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MAX_TABLE_CAPACITY, MIN_NAME_LENGTH, MIN_TABLE_CAPACITY,
};

/// Chilean phone numbers: optional +56 prefix, then 9 digits not starting
/// with 0 or 1 (mobile `9xxxxxxxx`, landline `2xxxxxxxx`).
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?56)?[2-9]\d{8}$").expect("phone pattern is a valid regex")
});

// =============================================================================
// Customer Fields
// =============================================================================

/// Validates a customer name.
///
/// ## Rules
/// - Trimmed before checking
/// - Between 2 and 50 characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required);
    }

    let len = name.chars().count();
    if len < MIN_NAME_LENGTH {
        return Err(ValidationError::TooShort {
            min: MIN_NAME_LENGTH,
        });
    }
    if len > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(name.to_string())
}

/// Validates an email address.
///
/// ## Returns
/// The trimmed, lowercased address. Uniqueness is compared on this form.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::Required);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_EMAIL_LENGTH,
        });
    }

    if !email.validate_email() {
        return Err(ValidationError::InvalidFormat {
            reason: "not a valid email address".to_string(),
        });
    }

    Ok(email)
}

/// Validates a phone number.
///
/// Spaces, dashes and parentheses are stripped before matching, so
/// `+56 9 1234-5678` and `912345678` are both accepted.
///
/// ## Example
/// ```rust
/// use tablebook_core::validation::validate_phone;
///
/// assert_eq!(validate_phone("+56 (9) 1234-5678").unwrap(), "+56912345678");
/// assert!(validate_phone("12345").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let cleaned: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationError::Required);
    }

    if !PHONE_PATTERN.is_match(&cleaned) {
        return Err(ValidationError::InvalidFormat {
            reason: "use a Chilean number such as +56912345678".to_string(),
        });
    }

    Ok(cleaned)
}

/// Validates a full customer payload, collecting every failing field.
///
/// ## Returns
/// The normalized payload (trimmed name, lowercased email, cleaned phone).
pub fn validate_new_customer(input: &NewCustomer) -> Result<NewCustomer, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = errors.check("name", validate_customer_name(&input.name));
    let email = errors.check("email", validate_email(&input.email));
    let phone = errors.check("phone", validate_phone(&input.phone));

    match (name, email, phone) {
        (Some(name), Some(email), Some(phone)) => Ok(NewCustomer { name, email, phone }),
        _ => Err(errors),
    }
}

/// Validates the fields present in a customer patch.
pub fn validate_customer_update(input: &CustomerUpdate) -> Result<CustomerUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = input
        .name
        .as_deref()
        .and_then(|n| errors.check("name", validate_customer_name(n)));
    let email = input
        .email
        .as_deref()
        .and_then(|e| errors.check("email", validate_email(e)));
    let phone = input
        .phone
        .as_deref()
        .and_then(|p| errors.check("phone", validate_phone(p)));

    errors.into_result()?;
    Ok(CustomerUpdate { name, email, phone })
}

// =============================================================================
// Table Fields
// =============================================================================

/// Validates a table number. Must be greater than zero.
pub fn validate_table_number(number: u32) -> ValidationResult<()> {
    if number == 0 {
        return Err(ValidationError::MustBePositive);
    }

    Ok(())
}

/// Validates seating capacity.
///
/// ## Example
/// ```rust
/// use tablebook_core::validation::validate_capacity;
///
/// assert!(validate_capacity(1).is_ok());
/// assert!(validate_capacity(20).is_ok());
/// assert!(validate_capacity(0).is_err());
/// ```
pub fn validate_capacity(capacity: u32) -> ValidationResult<()> {
    if !(MIN_TABLE_CAPACITY..=MAX_TABLE_CAPACITY).contains(&capacity) {
        return Err(ValidationError::OutOfRange {
            min: i64::from(MIN_TABLE_CAPACITY),
            max: i64::from(MAX_TABLE_CAPACITY),
        });
    }

    Ok(())
}

/// Validates a full table payload.
pub fn validate_new_table(input: &NewTable) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check("table_number", validate_table_number(input.table_number));
    errors.check("capacity", validate_capacity(input.capacity));
    errors.into_result()
}

/// Validates the fields present in a table patch.
pub fn validate_table_update(input: &TableUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(number) = input.table_number {
        errors.check("table_number", validate_table_number(number));
    }
    if let Some(capacity) = input.capacity {
        errors.check("capacity", validate_capacity(capacity));
    }
    errors.into_result()
}

// =============================================================================
// Reservation Fields
// =============================================================================

/// Validates a reservation date against `today`.
///
/// ## Rules
/// - Not before today (today itself is fine)
/// - Not after `today + max_advance_days`
pub fn validate_reservation_date(
    date: NaiveDate,
    today: NaiveDate,
    policy: &BookingPolicy,
) -> ValidationResult<()> {
    if date < today {
        return Err(ValidationError::DateInPast);
    }

    if date > policy.latest_bookable_date(today) {
        return Err(ValidationError::DateTooFar {
            max_days: policy.max_advance_days,
        });
    }

    Ok(())
}

/// Validates that a reservation time falls within opening hours.
///
/// ## Boundaries (default policy)
/// ```text
/// 11:59 ✗   12:00 ✓   22:30 ✓   22:59 ✓ (hour 22)   23:00 ✗
/// ```
pub fn validate_business_hours(time: NaiveTime, policy: &BookingPolicy) -> ValidationResult<()> {
    if !policy.is_within_hours(time) {
        return Err(ValidationError::OutOfBusinessHours {
            opening_hour: policy.opening_hour,
            closing_hour: policy.closing_hour,
        });
    }

    Ok(())
}

/// Validates that a reservation time starts on a slot boundary
/// (`:00` or `:30` by default, with zero seconds).
pub fn validate_time_granularity(time: NaiveTime, policy: &BookingPolicy) -> ValidationResult<()> {
    if !policy.is_on_slot_boundary(time) {
        return Err(ValidationError::InvalidTimeGranularity {
            slot_minutes: policy.slot_minutes,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_validate_customer_name() {
        assert_eq!(validate_customer_name("  Ana  ").unwrap(), "Ana");
        assert_eq!(validate_customer_name(""), Err(ValidationError::Required));
        assert_eq!(
            validate_customer_name("A"),
            Err(ValidationError::TooShort { min: 2 })
        );
        assert!(validate_customer_name(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email("Juan.Perez@Email.com").unwrap(),
            "juan.perez@email.com"
        );
        assert!(validate_email("not-an-email").is_err());
        assert_eq!(validate_email("   "), Err(ValidationError::Required));
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("912345678").unwrap(), "912345678");
        assert_eq!(validate_phone("221234567").unwrap(), "221234567");
        assert_eq!(validate_phone("+56 9 1234 5678").unwrap(), "+56912345678");
        assert!(validate_phone("112345678").is_err());
        assert!(validate_phone("9123").is_err());
        assert!(validate_phone("phone").is_err());
    }

    #[test]
    fn test_validate_new_customer_collects_all_fields() {
        let input = NewCustomer {
            name: "A".to_string(),
            email: "bad".to_string(),
            phone: "1".to_string(),
        };
        let errors = validate_new_customer(&input).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.for_field("name").count(), 1);
        assert_eq!(errors.for_field("email").count(), 1);
        assert_eq!(errors.for_field("phone").count(), 1);
    }

    #[test]
    fn test_validate_new_customer_normalizes() {
        let input = NewCustomer {
            name: " María González ".to_string(),
            email: "Maria.Gonzalez@Email.com".to_string(),
            phone: "9-2345-6789".to_string(),
        };
        let clean = validate_new_customer(&input).unwrap();
        assert_eq!(clean.name, "María González");
        assert_eq!(clean.email, "maria.gonzalez@email.com");
        assert_eq!(clean.phone, "923456789");
    }

    #[test]
    fn test_validate_customer_update_only_checks_present_fields() {
        let ok = validate_customer_update(&CustomerUpdate {
            email: Some("NEW@mail.com".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ok.email.as_deref(), Some("new@mail.com"));
        assert!(ok.name.is_none());

        let err = validate_customer_update(&CustomerUpdate {
            phone: Some("000".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.for_field("phone").count(), 1);
    }

    #[test]
    fn test_validate_table() {
        assert!(validate_table_number(1).is_ok());
        assert_eq!(validate_table_number(0), Err(ValidationError::MustBePositive));

        assert!(validate_capacity(1).is_ok());
        assert!(validate_capacity(20).is_ok());
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(21).is_err());

        let errors = validate_new_table(&NewTable {
            table_number: 0,
            capacity: 25,
            is_active: true,
        })
        .unwrap_err();
        assert_eq!(errors.len(), 2);

        assert!(validate_table_update(&TableUpdate {
            capacity: Some(8),
            ..Default::default()
        })
        .is_ok());
    }

    #[test]
    fn test_validate_reservation_date() {
        let policy = BookingPolicy::default();
        let today = d(2026, 6, 10);

        assert!(validate_reservation_date(today, today, &policy).is_ok());
        assert_eq!(
            validate_reservation_date(d(2026, 6, 9), today, &policy),
            Err(ValidationError::DateInPast)
        );
        assert!(validate_reservation_date(d(2026, 9, 8), today, &policy).is_ok());
        assert_eq!(
            validate_reservation_date(d(2026, 9, 9), today, &policy),
            Err(ValidationError::DateTooFar { max_days: 90 })
        );
    }

    #[test]
    fn test_validate_time_boundaries() {
        let policy = BookingPolicy::default();

        assert!(validate_business_hours(t(11, 59), &policy).is_err());
        assert!(validate_business_hours(t(12, 0), &policy).is_ok());
        assert!(validate_business_hours(t(22, 30), &policy).is_ok());
        assert!(validate_business_hours(t(23, 0), &policy).is_err());

        assert!(validate_time_granularity(t(12, 0), &policy).is_ok());
        assert!(validate_time_granularity(t(12, 30), &policy).is_ok());
        assert_eq!(
            validate_time_granularity(t(12, 15), &policy),
            Err(ValidationError::InvalidTimeGranularity { slot_minutes: 30 })
        );
    }
}
