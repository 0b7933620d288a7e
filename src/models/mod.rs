//! Domain models for the parking ledger.
//!
//! # Core Concepts
//!
//! ## Live Entities
//!
//! - [`VehicleSession`]: A vehicle currently occupying a slot. Exactly one
//!   session per plate can be parked at a time.
//!
//! ## Permanent Entities
//!
//! - [`HistoryRecord`]: Append-only record of a completed session, created when
//!   a vehicle exits. Records are never edited or removed.
//! - [`FacilityState`]: The full persisted document (capacity counters, active
//!   sessions and history).
//!
//! ## Lookups
//!
//! - [`TariffTable`]: Hourly rate per [`VehicleType`], with a default rate for
//!   types that have no tariff of their own.
//! - [`Alert`]: Advisory conditions derived from the state (low capacity,
//!   overstay, frequent-customer discount).

mod alert;
mod history;
mod session;
mod state;
mod tariff;
pub mod timestamp;
mod vehicle;

pub use alert::*;
pub use history::*;
pub use session::*;
pub use state::*;
pub use tariff::*;
pub use vehicle::*;
