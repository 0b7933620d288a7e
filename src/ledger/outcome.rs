use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::models::{Alert, HistoryRecord, Location, VehicleSession};

/// Result of a successful entry.
///
/// `write_failure` is set when the state changed in memory but could not be
/// written through; the entry still stands.
#[derive(Debug)]
pub struct EntryOutcome {
    pub session: VehicleSession,
    pub alerts: Vec<Alert>,
    pub write_failure: Option<LedgerError>,
}

impl EntryOutcome {
    pub fn is_persisted(&self) -> bool {
        self.write_failure.is_none()
    }
}

/// Result of a successful exit. See [`EntryOutcome`] for `write_failure`.
#[derive(Debug)]
pub struct ExitOutcome {
    pub record: HistoryRecord,
    pub write_failure: Option<LedgerError>,
}

impl ExitOutcome {
    pub fn is_persisted(&self) -> bool {
        self.write_failure.is_none()
    }
}

/// Where a located plate's coordinate came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// The vehicle is parked there now.
    Parked,
    /// Taken from the plate's most recent completed session.
    LastKnown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocatedVehicle {
    pub plate: String,
    pub location: Location,
    pub source: LocationSource,
}
