use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::vehicle::{CustomerTier, VehicleType};

/// Discount factor applied to frequent customers.
pub const FREQUENT_DISCOUNT: f64 = 0.9;

const SECONDS_PER_HOUR: i64 = 3600;

/// Hourly rate per vehicle type.
///
/// Types without a rate of their own are billed at `default_rate`, so a new
/// vehicle category can be parked before the tariff is updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TariffTable {
    pub rates: BTreeMap<VehicleType, f64>,
    pub default_rate: f64,
}

impl Default for TariffTable {
    fn default() -> Self {
        let rates = BTreeMap::from([
            (VehicleType::Car, 2000.0),
            (VehicleType::Motorcycle, 1000.0),
            (VehicleType::Bicycle, 500.0),
        ]);
        Self {
            rates,
            default_rate: 1000.0,
        }
    }
}

impl TariffTable {
    pub fn new(rates: BTreeMap<VehicleType, f64>, default_rate: f64) -> Self {
        Self {
            rates,
            default_rate,
        }
    }

    pub fn rate(&self, vehicle_type: &VehicleType) -> f64 {
        self.rates
            .get(vehicle_type)
            .copied()
            .unwrap_or(self.default_rate)
    }

    /// Fee for a stay of `billed_hours` by a customer of `tier`.
    pub fn fee(&self, vehicle_type: &VehicleType, billed_hours: u64, tier: CustomerTier) -> f64 {
        let base = billed_hours as f64 * self.rate(vehicle_type);
        match tier {
            CustomerTier::Normal => base,
            CustomerTier::Frequent => base * FREQUENT_DISCOUNT,
            CustomerTier::Monthly => 0.0,
        }
    }
}

/// Whole hours billed for a stay of `elapsed_seconds`.
///
/// Partial hours are dropped, but every stay bills at least one hour.
pub fn billed_hours(elapsed_seconds: i64) -> u64 {
    let whole = elapsed_seconds.max(0) / SECONDS_PER_HOUR;
    whole.max(1) as u64
}
