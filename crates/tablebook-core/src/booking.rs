//! # Reservation Validator
//!
//! Decides whether a reservation create or update may be committed.
//!
//! ## Rule Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ReservationCandidate                                                   │
//! │  (proposed row + its customer + its table + previous row on update)     │
//! │       │                                                                 │
//! │       ├── 1. date      ─► DateInPast / DateTooFar         (field: date) │
//! │       ├── 2. time      ─► OutOfBusinessHours               (field: time) │
//! │       │                ─► InvalidTimeGranularity           (field: time) │
//! │       ├── 3. ownership ─► OwnershipMismatch    (customer / table / owner)│
//! │       └── 4. slot      ─► SlotConflict                    (field: table) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  every rule runs; all failures come back together                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Updates
//! - The date and time rules only run when that field changed, so staff can
//!   still confirm or complete yesterday's booking.
//! - Ownership and the slot rule always run; the reservation's own id is
//!   excluded from the slot check.
//! - A reservation that ends up cancelled holds no slot, so the slot rule is
//!   skipped for it.
//! - The slot rule is skipped when the table belongs to someone else, so the
//!   answer never reveals another tenant's bookings.

use chrono::NaiveDate;

use crate::availability::is_available;
use crate::error::{ValidationError, ValidationErrors};
use crate::policy::BookingPolicy;
use crate::types::{Customer, DiningTable, OwnerContext, Reservation};
use crate::validation::{
    validate_business_hours, validate_reservation_date, validate_time_granularity,
};

/// Everything the validator needs to judge one reservation mutation.
#[derive(Debug, Clone, Copy)]
pub struct ReservationCandidate<'a> {
    /// The caller's tenant.
    pub owner: &'a OwnerContext,

    /// The reservation as it would be stored.
    pub proposed: &'a Reservation,

    /// The customer `proposed.customer_id` points at.
    pub customer: &'a Customer,

    /// The table `proposed.table_id` points at.
    pub table: &'a DiningTable,

    /// The stored row when this is an update; `None` on create.
    pub previous: Option<&'a Reservation>,
}

impl<'a> ReservationCandidate<'a> {
    pub fn is_update(&self) -> bool {
        self.previous.is_some()
    }
}

/// Runs the reservation rules against a policy and a fixed "today".
#[derive(Debug, Clone, Copy)]
pub struct ReservationValidator<'a> {
    policy: &'a BookingPolicy,
    today: NaiveDate,
}

impl<'a> ReservationValidator<'a> {
    pub fn new(policy: &'a BookingPolicy, today: NaiveDate) -> Self {
        ReservationValidator { policy, today }
    }

    /// Validates `candidate`.
    ///
    /// ## Arguments
    /// * `candidate` - The proposed reservation and what it references
    /// * `slot_holders` - Reservations currently stored for the proposed
    ///   slot; extra rows are harmless, rows outside the slot are ignored
    ///
    /// ## Returns
    /// * `Ok(())` - Safe to write
    /// * `Err(ValidationErrors)` - Every rule that failed, keyed by field
    pub fn validate<'r, I>(
        &self,
        candidate: &ReservationCandidate<'_>,
        slot_holders: I,
    ) -> Result<(), ValidationErrors>
    where
        I: IntoIterator<Item = &'r Reservation>,
    {
        let proposed = candidate.proposed;
        let previous = candidate.previous;
        let mut errors = ValidationErrors::new();

        // Rule 1: date
        if previous.map_or(true, |p| p.date != proposed.date) {
            errors.check(
                "date",
                validate_reservation_date(proposed.date, self.today, self.policy),
            );
        }

        // Rule 2: time
        if previous.map_or(true, |p| p.time != proposed.time) {
            errors.check("time", validate_business_hours(proposed.time, self.policy));
            errors.check("time", validate_time_granularity(proposed.time, self.policy));
        }

        // Rule 3: ownership
        let declared_owner = proposed.owner_id.as_str();
        if !candidate.owner.owns(declared_owner) {
            errors.push("owner", ValidationError::OwnershipMismatch);
        }
        if candidate.customer.owner_id != declared_owner {
            errors.push("customer", ValidationError::OwnershipMismatch);
        }
        let table_owned = candidate.table.owner_id == declared_owner;
        if !table_owned {
            errors.push("table", ValidationError::OwnershipMismatch);
        }

        // Rule 4: availability
        if table_owned && proposed.status.occupies_slot() {
            let slot = proposed.slot();
            let exclude = previous.map(|p| p.id.as_str());
            if !is_available(slot_holders, &slot, exclude) {
                errors.push(
                    "table",
                    ValidationError::SlotConflict {
                        table_number: candidate.table.table_number,
                        date: proposed.date,
                        time: proposed.time,
                    },
                );
            }
        }

        errors.into_result()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReservationStatus;
    use chrono::{NaiveTime, Utc};

    const OWNER: &str = "owner-u";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn customer(owner: &str) -> Customer {
        let now = Utc::now();
        Customer {
            id: "c1".to_string(),
            owner_id: owner.to_string(),
            name: "Carla".to_string(),
            email: "carla@example.com".to_string(),
            phone: "912345678".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn table(owner: &str) -> DiningTable {
        let now = Utc::now();
        DiningTable {
            id: "t1".to_string(),
            owner_id: owner.to_string(),
            table_number: 1,
            capacity: 4,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn reservation(id: &str, date: NaiveDate, time: NaiveTime) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: id.to_string(),
            owner_id: OWNER.to_string(),
            date,
            time,
            customer_id: "c1".to_string(),
            table_id: "t1".to_string(),
            status: ReservationStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate_new(
        proposed: &Reservation,
        holders: &[Reservation],
    ) -> Result<(), ValidationErrors> {
        let policy = BookingPolicy::default();
        let owner = OwnerContext::new(OWNER);
        let customer = customer(OWNER);
        let table = table(OWNER);
        let candidate = ReservationCandidate {
            owner: &owner,
            proposed,
            customer: &customer,
            table: &table,
            previous: None,
        };
        ReservationValidator::new(&policy, today()).validate(&candidate, holders)
    }

    #[test]
    fn test_valid_reservation_passes() {
        let proposed = reservation("r1", today(), t(12, 0));
        assert!(validate_new(&proposed, &[]).is_ok());
    }

    #[test]
    fn test_time_boundaries() {
        let accepted = [t(12, 0), t(12, 30), t(22, 30)];
        for time in accepted {
            assert!(validate_new(&reservation("r1", today(), time), &[]).is_ok(), "{time}");
        }

        let errors = validate_new(&reservation("r1", today(), t(11, 59)), &[]).unwrap_err();
        assert!(errors.contains(|e| matches!(e, ValidationError::OutOfBusinessHours { .. })));

        let errors = validate_new(&reservation("r1", today(), t(23, 0)), &[]).unwrap_err();
        assert!(errors.contains(|e| matches!(e, ValidationError::OutOfBusinessHours { .. })));

        let errors = validate_new(&reservation("r1", today(), t(12, 15)), &[]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains(|e| matches!(e, ValidationError::InvalidTimeGranularity { .. })));
    }

    #[test]
    fn test_date_boundaries() {
        assert!(validate_new(&reservation("r1", today(), t(20, 0)), &[]).is_ok());

        let yesterday = today().pred_opt().unwrap();
        let errors = validate_new(&reservation("r1", yesterday, t(20, 0)), &[]).unwrap_err();
        assert_eq!(
            errors.for_field("date").collect::<Vec<_>>(),
            vec![&ValidationError::DateInPast]
        );
    }

    #[test]
    fn test_collects_every_failure() {
        let yesterday = today().pred_opt().unwrap();
        let errors = validate_new(&reservation("r1", yesterday, t(11, 15)), &[]).unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.for_field("date").count(), 1);
        assert_eq!(errors.for_field("time").count(), 2);
    }

    #[test]
    fn test_slot_conflict_names_table_date_time() {
        let holder = reservation("r0", today(), t(12, 0));
        let proposed = reservation("r1", today(), t(12, 0));

        let errors = validate_new(&proposed, &[holder]).unwrap_err();
        let conflict: Vec<_> = errors.for_field("table").collect();
        assert_eq!(
            conflict,
            vec![&ValidationError::SlotConflict {
                table_number: 1,
                date: today(),
                time: t(12, 0),
            }]
        );
    }

    #[test]
    fn test_cancelled_holder_frees_slot() {
        let mut holder = reservation("r0", today(), t(12, 0));
        holder.status = ReservationStatus::Cancelled;
        let proposed = reservation("r1", today(), t(12, 0));

        assert!(validate_new(&proposed, &[holder]).is_ok());
    }

    #[test]
    fn test_ownership_mismatch_regardless_of_date_and_time() {
        let policy = BookingPolicy::default();
        let owner = OwnerContext::new(OWNER);
        let customer = customer("owner-u2");
        let table = table(OWNER);

        for (date, time) in [(today(), t(12, 0)), (today().pred_opt().unwrap(), t(9, 10))] {
            let proposed = reservation("r1", date, time);
            let candidate = ReservationCandidate {
                owner: &owner,
                proposed: &proposed,
                customer: &customer,
                table: &table,
                previous: None,
            };
            let errors = ReservationValidator::new(&policy, today())
                .validate(&candidate, std::iter::empty())
                .unwrap_err();
            assert_eq!(
                errors.for_field("customer").collect::<Vec<_>>(),
                vec![&ValidationError::OwnershipMismatch]
            );
        }
    }

    #[test]
    fn test_foreign_table_skips_slot_check() {
        let policy = BookingPolicy::default();
        let owner = OwnerContext::new(OWNER);
        let customer = customer(OWNER);
        let table = table("owner-u1");
        let proposed = reservation("r1", today(), t(12, 0));
        let mut foreign_holder = reservation("r0", today(), t(12, 0));
        foreign_holder.owner_id = "owner-u1".to_string();

        let candidate = ReservationCandidate {
            owner: &owner,
            proposed: &proposed,
            customer: &customer,
            table: &table,
            previous: None,
        };
        let errors = ReservationValidator::new(&policy, today())
            .validate(&candidate, &[foreign_holder])
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors.contains(|e| matches!(e, ValidationError::OwnershipMismatch)));
        assert!(!errors.contains(|e| matches!(e, ValidationError::SlotConflict { .. })));
    }

    #[test]
    fn test_update_excludes_itself_and_skips_unchanged_past_date() {
        let policy = BookingPolicy::default();
        let owner = OwnerContext::new(OWNER);
        let customer = customer(OWNER);
        let table = table(OWNER);
        let last_week = today() - chrono::Duration::days(7);

        let stored = reservation("r1", last_week, t(20, 0));
        let mut completed = stored.clone();
        completed.status = ReservationStatus::Completed;

        let candidate = ReservationCandidate {
            owner: &owner,
            proposed: &completed,
            customer: &customer,
            table: &table,
            previous: Some(&stored),
        };
        assert!(candidate.is_update());
        assert!(ReservationValidator::new(&policy, today())
            .validate(&candidate, [&stored])
            .is_ok());
    }

    #[test]
    fn test_update_moving_onto_taken_slot_conflicts() {
        let policy = BookingPolicy::default();
        let owner = OwnerContext::new(OWNER);
        let customer = customer(OWNER);
        let table = table(OWNER);

        let stored = reservation("r1", today(), t(19, 0));
        let other = reservation("r2", today(), t(20, 0));
        let mut moved = stored.clone();
        moved.time = t(20, 0);

        let candidate = ReservationCandidate {
            owner: &owner,
            proposed: &moved,
            customer: &customer,
            table: &table,
            previous: Some(&stored),
        };
        let errors = ReservationValidator::new(&policy, today())
            .validate(&candidate, [&other])
            .unwrap_err();
        assert!(errors.contains(|e| matches!(e, ValidationError::SlotConflict { .. })));
    }

    #[test]
    fn test_cancelling_never_conflicts() {
        let policy = BookingPolicy::default();
        let owner = OwnerContext::new(OWNER);
        let customer = customer(OWNER);
        let table = table(OWNER);

        let mut stored = reservation("r1", today(), t(19, 0));
        stored.status = ReservationStatus::Cancelled;
        let rebooked = reservation("r2", today(), t(19, 0));
        let mut edited = stored.clone();
        edited.notes = Some("called back".to_string());

        let candidate = ReservationCandidate {
            owner: &owner,
            proposed: &edited,
            customer: &customer,
            table: &table,
            previous: Some(&stored),
        };
        assert!(ReservationValidator::new(&policy, today())
            .validate(&candidate, [&rebooked])
            .is_ok());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let yesterday = today().pred_opt().unwrap();
        let holder = reservation("r0", yesterday, t(12, 45));
        let proposed = reservation("r1", yesterday, t(12, 45));

        let first = validate_new(&proposed, std::slice::from_ref(&holder));
        let second = validate_new(&proposed, std::slice::from_ref(&holder));
        assert_eq!(first, second);
        assert!(first.is_err());
    }
}
