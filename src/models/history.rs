use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::timestamp;
use super::vehicle::{CustomerTier, Location, VehicleType};

/// An append-only record of a completed parking session.
///
/// Created when a vehicle exits, from the session that was parked plus the
/// billing outcome. The tier is the one the session had at exit time, and the
/// operator is whoever was logged in when the exit was registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "StoredRecord")]
pub struct HistoryRecord {
    pub plate: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub customer_tier: CustomerTier,
    #[serde(with = "timestamp")]
    pub entry_time: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub exit_time: NaiveDateTime,
    pub billed_hours: u64,
    pub total: f64,
    pub operator: Option<String>,
    #[serde(flatten)]
    pub location: Option<Location>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(alias = "placa")]
    plate: String,
    #[serde(rename = "type", alias = "tipo")]
    vehicle_type: VehicleType,
    #[serde(default, alias = "cliente")]
    customer_tier: CustomerTier,
    #[serde(with = "timestamp", alias = "hora_entrada")]
    entry_time: NaiveDateTime,
    #[serde(with = "timestamp", alias = "hora_salida")]
    exit_time: NaiveDateTime,
    #[serde(alias = "horas")]
    billed_hours: u64,
    total: f64,
    #[serde(default, alias = "operador")]
    operator: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl TryFrom<StoredRecord> for HistoryRecord {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let location = Location::from_parts(stored.lat, stored.lon)
            .map_err(|e| format!("history record {}: {}", stored.plate, e))?;
        Ok(Self {
            plate: stored.plate,
            vehicle_type: stored.vehicle_type,
            customer_tier: stored.customer_tier,
            entry_time: stored.entry_time,
            exit_time: stored.exit_time,
            billed_hours: stored.billed_hours,
            total: stored.total,
            operator: stored.operator,
            location,
        })
    }
}

impl HistoryRecord {
    pub fn matches_plate(&self, plate: &str) -> bool {
        self.plate.eq_ignore_ascii_case(plate)
    }
}
