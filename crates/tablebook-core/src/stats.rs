//! # Statistics Aggregator
//!
//! Read-only rollups over an owner's reservations.
//!
//! ## Input
//! The store loads the owner-scoped [`ReservationDetail`] rows (reservation
//! joined with customer name/email and table number/capacity) and hands them
//! here together with "today". Nothing in this module touches the database.
//!
//! ## Windows
//! ```text
//!            trailing 30 days (inclusive)
//!   ┌────────────────────────────────────────────┐
//!   │                      trailing 7 (incl.)    │
//!   │                    ┌───────────────────────┤
//!   today-30   ...   today-7   ...   today-1   today   today+1 ...
//!   ◄──────────────── past (date < today) ──────►│◄── upcoming (date ≥ today) ──►
//! ```
//!
//! ## Rankings
//! Top lists hold at most [`TOP_N`] entries. Ties on count are broken by time
//! of day, table number, or customer name, so the same rows always give the
//! same ranking.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Customer, DiningTable, ReservationDetail, ReservationStatus};

/// Length of every top-N list.
pub const TOP_N: usize = 5;

/// Weekday labels, indexed by days from Sunday.
pub const WEEKDAY_LABELS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

// =============================================================================
// Building Blocks
// =============================================================================

/// Reservation counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusBreakdown {
    pub pending: u32,
    pub confirmed: u32,
    pub cancelled: u32,
    pub completed: u32,
}

impl StatusBreakdown {
    pub fn record(&mut self, status: ReservationStatus) {
        match status {
            ReservationStatus::Pending => self.pending += 1,
            ReservationStatus::Confirmed => self.confirmed += 1,
            ReservationStatus::Cancelled => self.cancelled += 1,
            ReservationStatus::Completed => self.completed += 1,
        }
    }

    pub fn get(&self, status: ReservationStatus) -> u32 {
        match status {
            ReservationStatus::Pending => self.pending,
            ReservationStatus::Confirmed => self.confirmed,
            ReservationStatus::Cancelled => self.cancelled,
            ReservationStatus::Completed => self.completed,
        }
    }

    pub fn total(&self) -> u32 {
        self.pending + self.confirmed + self.cancelled + self.completed
    }
}

/// An inclusive date range ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TrailingWindow {
    /// `[today - days, today]`.
    pub fn ending(today: NaiveDate, days: u64) -> Self {
        TrailingWindow {
            start: today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// A customer's reservation as seen from the customer's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VisitSummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    pub time: NaiveTime,
    pub table_number: u32,
    pub status: ReservationStatus,
}

/// A table's reservation as seen from the table's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingSummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    pub time: NaiveTime,
    pub customer_name: String,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeSlotCount {
    #[ts(as = "String")]
    pub time: NaiveTime,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableRanking {
    pub table_id: String,
    pub table_number: u32,
    pub capacity: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRanking {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WeekdayCount {
    pub weekday: String,
    pub total: u32,
}

// =============================================================================
// Results
// =============================================================================

/// Rollup for one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerStats {
    pub customer_id: String,
    pub customer_name: String,
    pub total: u32,
    pub by_status: StatusBreakdown,
    pub upcoming: u32,
    pub past: u32,
    pub last_reservation: Option<VisitSummary>,
    pub next_reservation: Option<VisitSummary>,
}

/// Rollup for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableStats {
    pub table_id: String,
    pub table_number: u32,
    pub capacity: u32,
    pub total: u32,
    pub by_status: StatusBreakdown,
    /// Confirmed plus completed reservations in the trailing 30 days.
    pub occupancy_last_30_days: u32,
    pub upcoming: u32,
    pub popular_times: Vec<TimeSlotCount>,
    pub last_reservation: Option<BookingSummary>,
    pub next_reservation: Option<BookingSummary>,
}

/// Rollup across all of an owner's reservations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OverviewStats {
    pub total: u32,
    pub by_status: StatusBreakdown,
    pub today: u32,
    pub last_7_days: u32,
    pub last_30_days: u32,
    pub upcoming: u32,
    pub past: u32,
    pub top_tables: Vec<TableRanking>,
    pub top_customers: Vec<CustomerRanking>,
    pub top_times: Vec<TimeSlotCount>,
    pub weekday_distribution: Vec<WeekdayCount>,
    /// Percentage of reservations that were cancelled, 2 decimals.
    pub cancellation_rate: f64,
    /// Trailing 30-day count divided by 30, 2 decimals.
    pub average_per_day: f64,
}

// =============================================================================
// Aggregations
// =============================================================================

/// Rollup for `customer` over `rows`. Rows for other customers are ignored.
pub fn customer_stats(
    customer: &Customer,
    rows: &[ReservationDetail],
    today: NaiveDate,
) -> CustomerStats {
    let own: Vec<&ReservationDetail> = rows
        .iter()
        .filter(|r| r.customer_id == customer.id)
        .collect();

    let (past, upcoming) = split_past_upcoming(&own, today);
    let to_visit = |r: &ReservationDetail| VisitSummary {
        date: r.date,
        time: r.time,
        table_number: r.table_number,
        status: r.status,
    };

    CustomerStats {
        customer_id: customer.id.clone(),
        customer_name: customer.name.clone(),
        total: count(own.len()),
        by_status: breakdown(&own),
        upcoming,
        past,
        last_reservation: last_before(&own, today).map(to_visit),
        next_reservation: next_from(&own, today).map(to_visit),
    }
}

/// Rollup for `table` over `rows`. Rows for other tables are ignored.
pub fn table_stats(table: &DiningTable, rows: &[ReservationDetail], today: NaiveDate) -> TableStats {
    let own: Vec<&ReservationDetail> = rows.iter().filter(|r| r.table_id == table.id).collect();

    let month = TrailingWindow::ending(today, 30);
    let occupancy = own
        .iter()
        .filter(|r| {
            matches!(r.status, ReservationStatus::Confirmed | ReservationStatus::Completed)
                && month.contains(r.date)
        })
        .count();

    let (_, upcoming) = split_past_upcoming(&own, today);
    let to_booking = |r: &ReservationDetail| BookingSummary {
        date: r.date,
        time: r.time,
        customer_name: r.customer_name.clone(),
        status: r.status,
    };

    TableStats {
        table_id: table.id.clone(),
        table_number: table.table_number,
        capacity: table.capacity,
        total: count(own.len()),
        by_status: breakdown(&own),
        occupancy_last_30_days: count(occupancy),
        upcoming,
        popular_times: top_times(&own),
        last_reservation: last_before(&own, today).map(to_booking),
        next_reservation: next_from(&own, today).map(to_booking),
    }
}

/// Rollup across every row in `rows`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tablebook_core::stats::overview;
///
/// let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
/// let stats = overview(&[], today);
/// assert_eq!(stats.total, 0);
/// assert_eq!(stats.cancellation_rate, 0.0);
/// assert!(stats.top_tables.is_empty());
/// ```
pub fn overview(rows: &[ReservationDetail], today: NaiveDate) -> OverviewStats {
    let all: Vec<&ReservationDetail> = rows.iter().collect();
    let week = TrailingWindow::ending(today, 7);
    let month = TrailingWindow::ending(today, 30);

    let by_status = breakdown(&all);
    let total = count(all.len());
    let in_month: Vec<&ReservationDetail> =
        all.iter().copied().filter(|r| month.contains(r.date)).collect();
    let (past, upcoming) = split_past_upcoming(&all, today);

    let cancellation_rate = if total == 0 {
        0.0
    } else {
        round2(f64::from(by_status.cancelled) / f64::from(total) * 100.0)
    };

    OverviewStats {
        total,
        by_status,
        today: count(all.iter().filter(|r| r.date == today).count()),
        last_7_days: count(all.iter().filter(|r| week.contains(r.date)).count()),
        last_30_days: count(in_month.len()),
        upcoming,
        past,
        top_tables: top_tables(&all),
        top_customers: top_customers(&all),
        top_times: top_times(&all),
        weekday_distribution: weekday_distribution(&in_month),
        cancellation_rate,
        average_per_day: round2(in_month.len() as f64 / 30.0),
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn breakdown(rows: &[&ReservationDetail]) -> StatusBreakdown {
    let mut out = StatusBreakdown::default();
    for r in rows {
        out.record(r.status);
    }
    out
}

/// `(past, upcoming)` where upcoming includes today.
fn split_past_upcoming(rows: &[&ReservationDetail], today: NaiveDate) -> (u32, u32) {
    let upcoming = rows.iter().filter(|r| r.date >= today).count();
    (count(rows.len() - upcoming), count(upcoming))
}

fn last_before<'a>(rows: &[&'a ReservationDetail], today: NaiveDate) -> Option<&'a ReservationDetail> {
    rows.iter()
        .copied()
        .filter(|r| r.date < today)
        .max_by_key(|r| (r.date, r.time))
}

fn next_from<'a>(rows: &[&'a ReservationDetail], today: NaiveDate) -> Option<&'a ReservationDetail> {
    rows.iter()
        .copied()
        .filter(|r| r.date >= today)
        .min_by_key(|r| (r.date, r.time))
}

fn top_times(rows: &[&ReservationDetail]) -> Vec<TimeSlotCount> {
    let mut counts: BTreeMap<NaiveTime, u32> = BTreeMap::new();
    for r in rows {
        *counts.entry(r.time).or_default() += 1;
    }

    let mut ranked: Vec<TimeSlotCount> = counts
        .into_iter()
        .map(|(time, total)| TimeSlotCount { time, total })
        .collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then(a.time.cmp(&b.time)));
    ranked.truncate(TOP_N);
    ranked
}

fn top_tables(rows: &[&ReservationDetail]) -> Vec<TableRanking> {
    let mut by_table: BTreeMap<&str, TableRanking> = BTreeMap::new();
    for r in rows {
        by_table
            .entry(r.table_id.as_str())
            .or_insert_with(|| TableRanking {
                table_id: r.table_id.clone(),
                table_number: r.table_number,
                capacity: r.table_capacity,
                total: 0,
            })
            .total += 1;
    }

    let mut ranked: Vec<TableRanking> = by_table.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then(a.table_number.cmp(&b.table_number))
    });
    ranked.truncate(TOP_N);
    ranked
}

fn top_customers(rows: &[&ReservationDetail]) -> Vec<CustomerRanking> {
    let mut by_customer: BTreeMap<&str, CustomerRanking> = BTreeMap::new();
    for r in rows {
        by_customer
            .entry(r.customer_id.as_str())
            .or_insert_with(|| CustomerRanking {
                customer_id: r.customer_id.clone(),
                name: r.customer_name.clone(),
                email: r.customer_email.clone(),
                total: 0,
            })
            .total += 1;
    }

    let mut ranked: Vec<CustomerRanking> = by_customer.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.email.cmp(&b.email))
    });
    ranked.truncate(TOP_N);
    ranked
}

/// Weekdays that have bookings, busiest first.
fn weekday_distribution(rows: &[&ReservationDetail]) -> Vec<WeekdayCount> {
    let mut counts = [0u32; 7];
    for r in rows {
        counts[r.date.weekday().num_days_from_sunday() as usize] += 1;
    }

    let mut days: Vec<(usize, u32)> = counts
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, total)| *total > 0)
        .collect();
    days.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    days.into_iter()
        .map(|(index, total)| WeekdayCount {
            weekday: WEEKDAY_LABELS[index].to_string(),
            total,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
