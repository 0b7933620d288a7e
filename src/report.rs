//! Read-side views over ledger snapshots: CSV export, revenue per operator and
//! occupancy per vehicle type.
//!
//! Nothing here touches the ledger's state; every function takes a slice of
//! records taken from a snapshot.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{timestamp, HistoryRecord, VehicleSession, VehicleType};

const CSV_HEADER: [&str; 10] = [
    "plate",
    "type",
    "customerTier",
    "entryTime",
    "exitTime",
    "billedHours",
    "total",
    "operator",
    "lat",
    "lon",
];

/// Sum of billed totals per operator.
///
/// Records exited while nobody was logged in have no operator and are left
/// out.
pub fn revenue_by_operator(history: &[HistoryRecord]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for record in history {
        if let Some(operator) = &record.operator {
            *totals.entry(operator.clone()).or_insert(0.0) += record.total;
        }
    }
    totals
}

/// Parked vehicles per type.
///
/// [`FacilityState::occupancy`](crate::models::FacilityState::occupancy) is
/// this count over the state's active set.
pub fn occupancy_by_type(active: &[VehicleSession]) -> BTreeMap<VehicleType, u32> {
    let mut counts = BTreeMap::new();
    for session in active {
        *counts.entry(session.vehicle_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Render history as CSV, one row per record in exit order.
pub fn history_csv(history: &[HistoryRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_history(&mut writer, history)?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Write the history CSV to `path`. Returns the number of records written.
pub fn export_history_csv(history: &[HistoryRecord], path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create report at {}", path.display()))?;
    write_history(&mut writer, history)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    tracing::info!("Exported {} history records to {}", history.len(), path.display());
    Ok(history.len())
}

fn write_history<W: Write>(writer: &mut csv::Writer<W>, history: &[HistoryRecord]) -> Result<()> {
    writer.write_record(CSV_HEADER)?;
    for record in history {
        let (lat, lon) = match record.location {
            Some(location) => (location.lat.to_string(), location.lon.to_string()),
            None => (String::new(), String::new()),
        };
        writer.write_record(&[
            record.plate.clone(),
            record.vehicle_type.to_string(),
            record.customer_tier.to_string(),
            timestamp::format(&record.entry_time),
            timestamp::format(&record.exit_time),
            record.billed_hours.to_string(),
            record.total.to_string(),
            record.operator.clone().unwrap_or_default(),
            lat,
            lon,
        ])?;
    }
    writer.flush()?;
    Ok(())
}
