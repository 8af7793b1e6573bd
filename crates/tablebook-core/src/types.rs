//! # Domain Types
//!
//! Core domain types used throughout Tablebook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │                        ┌─────────────────┐                              │
//! │                        │      Owner      │  (tenant account)            │
//! │                        └────────┬────────┘                              │
//! │              ┌──────────────────┼──────────────────┐                    │
//! │              ▼                  ▼                  ▼                    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │   DiningTable   │   │   Reservation   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  owner_id       │   │  owner_id       │   │  owner_id       │       │
//! │  │  email (uniq)   │   │  table_number   │   │  customer_id ───┼─► C   │
//! │  │  name, phone    │   │  capacity 1-20  │   │  table_id ──────┼─► T   │
//! │  └─────────────────┘   └─────────────────┘   │  date, time     │       │
//! │                                              │  status         │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! Every entity carries `owner_id`. The web layer resolves the caller into an
//! [`OwnerContext`] and hands it to every store and statistics call; nothing
//! in this workspace keeps an ambient "current owner".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Owner
// =============================================================================

/// The tenant a request acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerContext {
    pub owner_id: String,
}

impl OwnerContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        OwnerContext {
            owner_id: owner_id.into(),
        }
    }

    /// Whether a record with `owner_id` belongs to this tenant.
    #[inline]
    pub fn owns(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// A tenant account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Owner {
    pub id: String,
    pub username: String,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Owner {
    /// The context to pass into store calls made for this owner.
    pub fn context(&self) -> OwnerContext {
        OwnerContext::new(self.id.clone())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A restaurant customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this customer belongs to.
    pub owner_id: String,

    pub name: String,

    /// Lowercased; unique per owner.
    pub email: String,

    /// Normalized (no spaces, dashes or parentheses).
    pub phone: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Partial update for a customer. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Dining Table
// =============================================================================

/// A table in the restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiningTable {
    pub id: String,
    pub owner_id: String,

    /// Business identifier shown to staff; unique per owner.
    pub table_number: u32,

    /// Seats, 1 to 20.
    pub capacity: u32,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTable {
    pub table_number: u32,
    pub capacity: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update for a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableUpdate {
    pub table_number: Option<u32>,
    pub capacity: Option<u32>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Reservation Status
// =============================================================================

/// The status of a reservation.
///
/// Transitions are driven by staff; nothing moves a reservation between
/// states automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 4] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Cancelled,
        ReservationStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }

    /// Whether a reservation in this status holds its slot.
    ///
    /// Cancelled reservations free the slot for anyone else.
    #[inline]
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReservationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown reservation status: {}", s))
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// The (table, date, time) triple a reservation occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub table_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// A table booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub owner_id: String,

    #[ts(as = "String")]
    pub date: NaiveDate,

    #[ts(as = "String")]
    pub time: NaiveTime,

    pub customer_id: String,
    pub table_id: String,
    pub status: ReservationStatus,
    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn slot(&self) -> Slot {
        Slot {
            table_id: self.table_id.clone(),
            date: self.date,
            time: self.time,
        }
    }

    /// Whether this reservation sits on `slot`.
    pub fn is_in_slot(&self, slot: &Slot) -> bool {
        self.table_id == slot.table_id && self.date == slot.date && self.time == slot.time
    }
}

/// Input for creating a reservation. New reservations always start pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewReservation {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    pub time: NaiveTime,
    pub customer_id: String,
    pub table_id: String,
    pub notes: Option<String>,
}

/// Partial update for a reservation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationUpdate {
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub time: Option<NaiveTime>,
    pub customer_id: Option<String>,
    pub table_id: Option<String>,
    pub status: Option<ReservationStatus>,
    /// `Some("")` (or only whitespace) clears the stored notes.
    pub notes: Option<String>,
}

impl ReservationUpdate {
    /// An update that only changes the status.
    pub fn status(status: ReservationStatus) -> Self {
        ReservationUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Applies the patch on top of `existing`.
    pub fn apply_to(&self, existing: &Reservation) -> Reservation {
        Reservation {
            date: self.date.unwrap_or(existing.date),
            time: self.time.unwrap_or(existing.time),
            customer_id: self
                .customer_id
                .clone()
                .unwrap_or_else(|| existing.customer_id.clone()),
            table_id: self
                .table_id
                .clone()
                .unwrap_or_else(|| existing.table_id.clone()),
            status: self.status.unwrap_or(existing.status),
            notes: match self.notes.as_deref() {
                Some(notes) => normalize_notes(notes),
                None => existing.notes.clone(),
            },
            ..existing.clone()
        }
    }
}

/// Trimmed notes, or `None` when nothing is left.
pub fn normalize_notes(notes: &str) -> Option<String> {
    let notes = notes.trim();
    (!notes.is_empty()).then(|| notes.to_string())
}

// =============================================================================
// Reservation Detail
// =============================================================================

/// A reservation joined with the customer and table fields statistics need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReservationDetail {
    pub id: String,
    pub owner_id: String,
    pub customer_id: String,
    pub table_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: ReservationStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub table_number: u32,
    pub table_capacity: u32,
}

// =============================================================================
// Unit Tests
// =============================================================================
