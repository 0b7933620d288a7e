//! Parking facility ledger.
//!
//! Tracks vehicles occupying a facility with a fixed number of slots per
//! vehicle type, bills exits by the hour with customer-tier discounts, keeps an
//! append-only history of completed sessions and raises low-capacity and
//! overstay alerts. The whole facility state is written through to a JSON
//! document after every change.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod report;
pub mod store;

pub use error::{LedgerError, Result};
pub use ledger::Ledger;
