use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of vehicle a slot is reserved for.
///
/// The well-known categories get their own variants; any other label is kept
/// as [`VehicleType::Other`] so new categories can be parked (and billed at the
/// default rate) without a code change. Labels are trimmed and lowercased, and
/// the legacy labels `carro`, `moto` and `bici` map onto the known variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VehicleType {
    Car,
    Motorcycle,
    Bicycle,
    Other(String),
}

impl VehicleType {
    pub fn parse(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "car" | "carro" => Self::Car,
            "motorcycle" | "moto" => Self::Motorcycle,
            "bicycle" | "bike" | "bici" => Self::Bicycle,
            _ => Self::Other(label),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
            Self::Bicycle => "bicycle",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for VehicleType {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<&str> for VehicleType {
    fn from(label: &str) -> Self {
        Self::parse(label)
    }
}

impl From<VehicleType> for String {
    fn from(vehicle_type: VehicleType) -> Self {
        match vehicle_type {
            VehicleType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer classification used when billing an exit.
///
/// - `Normal`: full tariff
/// - `Frequent`: 10% discount; assigned automatically from the fifth visit
/// - `Monthly`: billed nothing at exit; only ever set by the caller and never
///   downgraded
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    #[default]
    Normal,
    #[serde(alias = "frecuente")]
    Frequent,
    #[serde(alias = "mensual")]
    Monthly,
}

impl CustomerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Frequent => "frequent",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for CustomerTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "normal" => Ok(Self::Normal),
            "frequent" | "frecuente" => Ok(Self::Frequent),
            "monthly" | "mensual" => Ok(Self::Monthly),
            other => Err(format!("unknown customer tier '{}'", other)),
        }
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a location from two optional halves.
    ///
    /// Both halves present gives `Ok(Some(_))`, both absent gives `Ok(None)`.
    /// A lone half or an out-of-range value is an error.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Result<Option<Self>, String> {
        match (lat, lon) {
            (None, None) => Ok(None),
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(format!("latitude {} is out of range", lat));
                }
                if !(-180.0..=180.0).contains(&lon) {
                    return Err(format!("longitude {} is out of range", lon));
                }
                Ok(Some(Self { lat, lon }))
            }
            _ => Err("latitude and longitude must be given together".to_string()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// Normalize a license plate for storage and lookup.
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}
