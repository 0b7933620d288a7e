//! Facility configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial (or
//! missing) file is fine. Lookup order for the file is an explicit path, then
//! `PARKING_CONFIG`, then `<config dir>/parking-ledger/config.json`. The data
//! file can be overridden with `PARKING_DATA_FILE`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{TariffTable, VehicleType};

const APP_NAME: &str = "parking-ledger";
const CONFIG_FILE: &str = "config.json";
const DATA_FILE: &str = "parking.json";

pub const CONFIG_ENV: &str = "PARKING_CONFIG";
pub const DATA_FILE_ENV: &str = "PARKING_DATA_FILE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FacilityConfig {
    /// Where the facility document is stored. `None` uses the platform data dir.
    pub data_file: Option<PathBuf>,
    /// Total slots per vehicle type.
    pub capacity: BTreeMap<VehicleType, u32>,
    /// Hourly rate per vehicle type.
    pub tariffs: BTreeMap<VehicleType, f64>,
    /// Rate for vehicle types missing from `tariffs`.
    pub default_rate: f64,
    /// Sessions parked longer than this raise an overstay alert.
    pub overstay_hours: i64,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        let tariffs = TariffTable::default();
        Self {
            data_file: None,
            capacity: BTreeMap::from([
                (VehicleType::Car, 50),
                (VehicleType::Motorcycle, 80),
                (VehicleType::Bicycle, 20),
            ]),
            tariffs: tariffs.rates,
            default_rate: tariffs.default_rate,
            overstay_hours: 24,
        }
    }
}

impl FacilityConfig {
    /// Load configuration, falling back to defaults when no file exists.
    ///
    /// A file that exists but cannot be parsed is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(default_config_path),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if explicit.is_some() => {
                anyhow::bail!("Config file {} does not exist", path.display())
            }
            _ => Self::default(),
        };

        if let Some(data_file) = std::env::var_os(DATA_FILE_ENV) {
            config.data_file = Some(PathBuf::from(data_file));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn tariff_table(&self) -> TariffTable {
        TariffTable::new(self.tariffs.clone(), self.default_rate)
    }

    /// Resolved location of the facility document.
    pub fn data_path(&self) -> Result<PathBuf> {
        match &self.data_file {
            Some(path) => Ok(path.clone()),
            None => {
                let dirs = directories::ProjectDirs::from("", "", APP_NAME)
                    .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
                Ok(dirs.data_dir().join(DATA_FILE))
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
