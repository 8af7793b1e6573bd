//! # tablebook-core: Pure Booking Logic for Tablebook
//!
//! This crate holds the rules that decide whether a table booking is legal
//! and the rollups that summarize booking activity. It performs no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tablebook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Web layer (routes, auth, JSON)                 │   │
//! │  │        resolves the caller into an OwnerContext                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tablebook-db (Database Layer)                   │   │
//! │  │     owner-scoped repositories, transactions, migrations         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ rows in, decisions out                 │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ tablebook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐ │   │
//! │  │   │validation │  │availability│  │  booking  │  │   stats   │ │   │
//! │  │   │  fields   │  │ slot free? │  │ validator │  │  rollups  │ │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │        NO I/O • NO DATABASE • TODAY IS PASSED IN               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, DiningTable, Reservation, ...)
//! - [`policy`] - Opening hours, slot length, booking horizon
//! - [`clock`] - Source of "today"
//! - [`validation`] - Field rules for customers, tables, dates and times
//! - [`availability`] - Whether a (table, date, time) slot is free
//! - [`booking`] - The reservation validator
//! - [`stats`] - Per-customer, per-table and overview statistics
//! - [`error`] - Validation error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveTime;
//! use tablebook_core::policy::BookingPolicy;
//! use tablebook_core::validation::{validate_business_hours, validate_time_granularity};
//!
//! let policy = BookingPolicy::default();
//! let lunch = NaiveTime::from_hms_opt(12, 30, 0).unwrap();
//! let late = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
//!
//! assert!(validate_business_hours(lunch, &policy).is_ok());
//! assert!(validate_time_granularity(lunch, &policy).is_ok());
//! assert!(validate_business_hours(late, &policy).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod booking;
pub mod clock;
pub mod error;
pub mod policy;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use booking::{ReservationCandidate, ReservationValidator};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{FieldError, ValidationError, ValidationErrors};
pub use policy::BookingPolicy;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shortest accepted customer name, after trimming.
pub const MIN_NAME_LENGTH: usize = 2;

/// Longest accepted customer name.
pub const MAX_NAME_LENGTH: usize = 50;

/// Longest accepted customer email.
pub const MAX_EMAIL_LENGTH: usize = 50;

/// Smallest table.
pub const MIN_TABLE_CAPACITY: u32 = 1;

/// Largest table.
///
/// Mirrored by the `dining_tables` CHECK constraint.
pub const MAX_TABLE_CAPACITY: u32 = 20;
