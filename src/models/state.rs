use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::history::HistoryRecord;
use super::session::VehicleSession;
use super::vehicle::VehicleType;

/// The full persisted facility document.
///
/// `capacity` holds the *remaining* free slots per type, not the configured
/// totals. History is kept in exit order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FacilityState {
    #[serde(default, alias = "cupos")]
    pub capacity: BTreeMap<VehicleType, u32>,
    #[serde(default, alias = "vehiculos")]
    pub active: Vec<VehicleSession>,
    #[serde(default, alias = "historial")]
    pub history: Vec<HistoryRecord>,
}

impl FacilityState {
    /// Number of active sessions per type.
    pub fn occupancy(&self) -> BTreeMap<VehicleType, u32> {
        crate::report::occupancy_by_type(&self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{timestamp, CustomerTier};

    #[test]
    fn occupancy_counts_active_sessions_per_type() {
        let parked = |plate: &str, vehicle_type: VehicleType| VehicleSession {
            plate: plate.to_string(),
            vehicle_type,
            entry_time: timestamp::parse("2024-05-01 08:00:00").unwrap(),
            customer_tier: CustomerTier::Normal,
            visit_count: 1,
            location: None,
        };
        let state = FacilityState {
            capacity: BTreeMap::new(),
            active: vec![
                parked("A1", VehicleType::Car),
                parked("A2", VehicleType::Car),
                parked("M1", VehicleType::Motorcycle),
            ],
            history: vec![],
        };

        let occupancy = state.occupancy();

        assert_eq!(occupancy[&VehicleType::Car], 2);
        assert_eq!(occupancy[&VehicleType::Motorcycle], 1);
        assert_eq!(occupancy.len(), 2);
    }
}
