use std::fmt;

use serde::{Deserialize, Serialize};

use super::vehicle::VehicleType;

/// Advisory condition raised by the ledger. Alerts never block an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Exactly one free slot left for this type.
    LowCapacity { vehicle_type: VehicleType },
    /// The entering customer will be billed with the frequent discount.
    FrequentCustomer { plate: String },
    /// Parked for longer than the overstay limit.
    Overstay { plate: String, hours: i64 },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowCapacity { vehicle_type } => {
                write!(f, "Only 1 slot left for {}", vehicle_type)
            }
            Self::FrequentCustomer { plate } => {
                write!(f, "Frequent customer {}: 10% discount at exit", plate)
            }
            Self::Overstay { plate, hours } => {
                write!(f, "Vehicle {} has been parked for more than {} hours", plate, hours)
            }
        }
    }
}
