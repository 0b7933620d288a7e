use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::VehicleType;

/// Errors raised by the ledger and its persistence adapter.
///
/// None of these is fatal to the process. `CapacityExhausted`,
/// `AlreadyParked`, `SessionNotFound` and `InvalidInput` are business outcomes
/// reported to the operator as-is.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No slots available for {vehicle_type}")]
    CapacityExhausted { vehicle_type: VehicleType },

    #[error("Vehicle {plate} is already parked")]
    AlreadyParked { plate: String },

    #[error("No parked vehicle with plate {plate}")]
    SessionNotFound { plate: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stored state at {} is unreadable: {reason}", path.display())]
    PersistenceCorrupt { path: PathBuf, reason: String },

    #[error("Failed to write state to {}: {source}", path.display())]
    PersistenceWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LedgerError {
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::PersistenceCorrupt { .. } | Self::PersistenceWriteFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
