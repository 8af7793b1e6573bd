//! # Booking Policy
//!
//! Opening hours, slot length and booking horizon.
//!
//! ## Default Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  12:00  12:30  13:00  ...  22:00  22:30 │ 23:00 (closed)               │
//! │    ✓      ✓      ✓           ✓      ✓   │   ✗                          │
//! │                                                                         │
//! │  Bookable dates: today ..= today + 90 days                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Days, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Rules the reservation validator checks times and dates against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// First bookable hour (inclusive).
    pub opening_hour: u32,

    /// Hour at which booking stops (exclusive).
    pub closing_hour: u32,

    /// Reservations start on multiples of this many minutes past the hour.
    pub slot_minutes: u32,

    /// How far ahead a reservation may be made.
    pub max_advance_days: u32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        BookingPolicy {
            opening_hour: 12,
            closing_hour: 23,
            slot_minutes: 30,
            max_advance_days: 90,
        }
    }
}

impl BookingPolicy {
    /// Whether `time` falls in `[opening_hour, closing_hour)`.
    pub fn is_within_hours(&self, time: NaiveTime) -> bool {
        let hour = time.hour();
        hour >= self.opening_hour && hour < self.closing_hour
    }

    /// Whether `time` starts exactly on a slot boundary.
    pub fn is_on_slot_boundary(&self, time: NaiveTime) -> bool {
        self.slot_minutes > 0
            && time.minute() % self.slot_minutes == 0
            && time.second() == 0
            && time.nanosecond() == 0
    }

    /// Last date a reservation may be made for, seen from `today`.
    pub fn latest_bookable_date(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_days(Days::new(u64::from(self.max_advance_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Every bookable start time of a day, in order.
    pub fn slot_times(&self) -> Vec<NaiveTime> {
        if self.slot_minutes == 0 {
            return Vec::new();
        }

        (self.opening_hour..self.closing_hour)
            .flat_map(|hour| {
                (0..60)
                    .step_by(self.slot_minutes as usize)
                    .filter_map(move |minute| NaiveTime::from_hms_opt(hour, minute, 0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_opening_hours_are_half_open() {
        let policy = BookingPolicy::default();
        assert!(!policy.is_within_hours(t(11, 59)));
        assert!(policy.is_within_hours(t(12, 0)));
        assert!(policy.is_within_hours(t(22, 30)));
        assert!(!policy.is_within_hours(t(23, 0)));
    }

    #[test]
    fn test_slot_boundaries() {
        let policy = BookingPolicy::default();
        assert!(policy.is_on_slot_boundary(t(12, 0)));
        assert!(policy.is_on_slot_boundary(t(12, 30)));
        assert!(!policy.is_on_slot_boundary(t(12, 15)));
        assert!(!policy.is_on_slot_boundary(NaiveTime::from_hms_opt(12, 0, 30).unwrap()));
    }

    #[test]
    fn test_slot_times_cover_the_day() {
        let slots = BookingPolicy::default().slot_times();
        assert_eq!(slots.len(), 22);
        assert_eq!(slots.first(), Some(&t(12, 0)));
        assert_eq!(slots.last(), Some(&t(22, 30)));
    }

    #[test]
    fn test_latest_bookable_date() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(
            BookingPolicy::default().latest_bookable_date(today),
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
        );
    }
}
