//! # Availability Checker
//!
//! Decides whether a slot is free given the reservations already in it.
//!
//! ## Rule
//! ```text
//! slot (table, date, time) is TAKEN iff some reservation R has
//!     R.slot == slot
//!     R.status != cancelled
//!     R.id != excluded id (the reservation being edited)
//! ```
//!
//! The store loads the candidate rows (one point query on the slot) and this
//! module decides. Cancelled rows are ignored, so a cancelled booking frees
//! its slot without being deleted.

use crate::types::{Reservation, Slot};

/// Returns the first reservation that holds `slot`, if any.
pub fn find_conflict<'a, I>(existing: I, slot: &Slot, exclude_id: Option<&str>) -> Option<&'a Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    existing.into_iter().find(|r| {
        r.is_in_slot(slot) && r.status.occupies_slot() && exclude_id != Some(r.id.as_str())
    })
}

/// Whether `slot` is free among `existing`.
///
/// ## Example
/// ```rust,ignore
/// // rows loaded from the store for (table, date, time)
/// if is_available(&holders, &editing.slot(), Some(&editing.id)) {
///     // moving the booking onto its own slot is always fine
/// }
/// ```
pub fn is_available<'a, I>(existing: I, slot: &Slot, exclude_id: Option<&str>) -> bool
where
    I: IntoIterator<Item = &'a Reservation>,
{
    find_conflict(existing, slot, exclude_id).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReservationStatus;
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn slot() -> Slot {
        Slot {
            table_id: "t1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
            time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        }
    }

    fn booking(id: &str, slot: &Slot, status: ReservationStatus) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: id.to_string(),
            owner_id: "o1".to_string(),
            date: slot.date,
            time: slot.time,
            customer_id: "c1".to_string(),
            table_id: slot.table_id.clone(),
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_slot_is_available() {
        let none: Vec<Reservation> = Vec::new();
        assert!(is_available(&none, &slot(), None));
    }

    #[test]
    fn test_each_live_status_blocks() {
        let s = slot();
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Completed,
        ] {
            let existing = vec![booking("r1", &s, status)];
            assert!(!is_available(&existing, &s, None), "{status} should block");
        }
    }

    #[test]
    fn test_cancelled_never_blocks() {
        let s = slot();
        let existing = vec![
            booking("r1", &s, ReservationStatus::Cancelled),
            booking("r2", &s, ReservationStatus::Cancelled),
        ];
        assert!(is_available(&existing, &s, None));
    }

    #[test]
    fn test_excluded_reservation_does_not_conflict_with_itself() {
        let s = slot();
        let existing = vec![booking("r1", &s, ReservationStatus::Confirmed)];
        assert!(is_available(&existing, &s, Some("r1")));
        assert!(!is_available(&existing, &s, Some("r2")));
    }

    #[test]
    fn test_other_slots_are_ignored() {
        let s = slot();
        let mut other_time = s.clone();
        other_time.time = NaiveTime::from_hms_opt(20, 30, 0).unwrap();
        let mut other_table = s.clone();
        other_table.table_id = "t2".to_string();
        let mut other_date = s.clone();
        other_date.date = NaiveDate::from_ymd_opt(2026, 7, 5).unwrap();

        let existing = vec![
            booking("r1", &other_time, ReservationStatus::Pending),
            booking("r2", &other_table, ReservationStatus::Pending),
            booking("r3", &other_date, ReservationStatus::Pending),
        ];
        assert!(is_available(&existing, &s, None));
    }

    #[test]
    fn test_find_conflict_returns_the_holder() {
        let s = slot();
        let existing = vec![
            booking("r1", &s, ReservationStatus::Cancelled),
            booking("r2", &s, ReservationStatus::Pending),
        ];
        assert_eq!(find_conflict(&existing, &s, None).map(|r| r.id.as_str()), Some("r2"));
    }
}
