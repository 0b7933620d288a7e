use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::timestamp;
use super::vehicle::{normalize_plate, CustomerTier, Location, VehicleType};
use crate::error::LedgerError;

/// Visits at which a customer is promoted to [`CustomerTier::Frequent`].
pub const FREQUENT_VISIT_THRESHOLD: u32 = 5;

/// A vehicle currently parked in the facility.
///
/// Sessions live in the ledger's active set from entry until exit. At exit a
/// session is consumed into a [`HistoryRecord`](super::HistoryRecord); a plate
/// that comes back later starts a brand-new session with a fresh entry time.
///
/// Legacy documents used Spanish keys; those are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "StoredSession")]
pub struct VehicleSession {
    pub plate: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    #[serde(with = "timestamp")]
    pub entry_time: NaiveDateTime,
    pub customer_tier: CustomerTier,
    /// Completed visits of this plate before this one, plus this one.
    pub visit_count: u32,
    #[serde(flatten)]
    pub location: Option<Location>,
}

/// On-disk shape of a session. Coordinates are read as two plain fields so a
/// lone or malformed half fails the load instead of vanishing.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(alias = "placa")]
    plate: String,
    #[serde(rename = "type", alias = "tipo")]
    vehicle_type: VehicleType,
    #[serde(with = "timestamp", alias = "hora_entrada")]
    entry_time: NaiveDateTime,
    #[serde(default, alias = "cliente")]
    customer_tier: CustomerTier,
    #[serde(default, alias = "visitas")]
    visit_count: u32,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl TryFrom<StoredSession> for VehicleSession {
    type Error = String;

    fn try_from(stored: StoredSession) -> Result<Self, Self::Error> {
        let location = Location::from_parts(stored.lat, stored.lon)
            .map_err(|e| format!("session {}: {}", stored.plate, e))?;
        Ok(Self {
            plate: stored.plate,
            vehicle_type: stored.vehicle_type,
            entry_time: stored.entry_time,
            customer_tier: stored.customer_tier,
            visit_count: stored.visit_count,
            location,
        })
    }
}

impl VehicleSession {
    /// Whether the session has been parked for strictly longer than `hours`.
    pub fn is_overstaying(&self, now: NaiveDateTime, hours: i64) -> bool {
        now.signed_duration_since(self.entry_time) > chrono::Duration::hours(hours)
    }
}

/// Caller-supplied data for a vehicle arriving at the facility.
///
/// The entry time and visit count are assigned by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    pub plate: String,
    pub vehicle_type: VehicleType,
    pub tier: CustomerTier,
    pub location: Option<Location>,
}

impl NewVehicle {
    /// Validate raw operator input into an arriving vehicle.
    pub fn parse(
        plate: &str,
        vehicle_type: &str,
        tier: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Self, LedgerError> {
        let plate = normalize_plate(plate);
        if plate.is_empty() {
            return Err(LedgerError::InvalidInput("plate must not be empty".to_string()));
        }
        if vehicle_type.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "vehicle type must not be empty".to_string(),
            ));
        }
        let tier = tier
            .map(str::parse::<CustomerTier>)
            .transpose()
            .map_err(LedgerError::InvalidInput)?
            .unwrap_or_default();
        let location = Location::from_parts(lat, lon).map_err(LedgerError::InvalidInput)?;

        Ok(Self {
            plate,
            vehicle_type: VehicleType::parse(vehicle_type),
            tier,
            location,
        })
    }

    pub fn new(plate: &str, vehicle_type: impl Into<VehicleType>) -> Self {
        Self {
            plate: normalize_plate(plate),
            vehicle_type: vehicle_type.into(),
            tier: CustomerTier::Normal,
            location: None,
        }
    }

    pub fn with_tier(mut self, tier: CustomerTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Tier a session ends up with after `visit_count` visits.
///
/// Monthly customers keep their tier; everyone else becomes frequent from the
/// fifth visit on. A caller-assigned frequent tier is kept as well.
pub fn effective_tier(requested: CustomerTier, visit_count: u32) -> CustomerTier {
    match requested {
        CustomerTier::Monthly => CustomerTier::Monthly,
        _ if visit_count >= FREQUENT_VISIT_THRESHOLD => CustomerTier::Frequent,
        other => other,
    }
}
