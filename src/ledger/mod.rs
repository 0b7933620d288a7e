//! The facility ledger: capacity counters, parked sessions and history.
//!
//! A [`Ledger`] is an explicitly constructed handle; clones share the same
//! state, separately opened ledgers are fully independent. Mutations take an
//! exclusive lock over the whole state and write it through to the
//! [`StateStore`] before releasing the lock, so the durable copy is always
//! written in mutation order. Queries take a shared lock and see a consistent
//! snapshot of counters, sessions and history together.

mod outcome;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::clock::{Clock, SystemClock};
use crate::config::FacilityConfig;
use crate::error::{LedgerError, Result};
use crate::models::*;
use crate::store::{MemoryStore, StateStore};

pub use outcome::*;

/// Remaining slots at which a type is reported as running low.
pub const LOW_CAPACITY_THRESHOLD: u32 = 1;

#[derive(Clone)]
pub struct Ledger {
    inner: Arc<RwLock<Inner>>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    tariffs: Arc<TariffTable>,
    overstay_hours: i64,
}

struct Inner {
    /// Total slots per type. Always `capacity[type] + parked(type)`.
    totals: BTreeMap<VehicleType, u32>,
    state: FacilityState,
    /// Completed sessions per normalized plate, mirrors `state.history`.
    visits: HashMap<String, u32>,
    operator: Option<String>,
}

impl Ledger {
    /// Open a ledger over `store`, failing if the stored state is unreadable.
    pub fn open(config: &FacilityConfig, store: Arc<dyn StateStore>) -> Result<Self> {
        let state = store.load()?;
        Ok(Self::from_state(config, store, state))
    }

    /// Open a ledger over `store`, starting empty if the stored state is
    /// unreadable.
    ///
    /// The unreadable document is quarantined so the first save cannot destroy
    /// it, and the load error is handed back for the caller to report.
    pub fn open_or_recover(
        config: &FacilityConfig,
        store: Arc<dyn StateStore>,
    ) -> (Self, Option<LedgerError>) {
        match store.load() {
            Ok(state) => (Self::from_state(config, store, state), None),
            Err(e) => {
                tracing::warn!("Starting from an empty facility: {}", e);
                match store.quarantine() {
                    Ok(Some(moved)) => {
                        tracing::warn!("Unreadable state moved to {}", moved.display())
                    }
                    Ok(None) => {}
                    Err(qe) => tracing::error!(
                        "Could not move unreadable state at {} aside: {}",
                        store.describe().display(),
                        qe
                    ),
                }
                let ledger = Self::from_state(config, store, FacilityState::default());
                (ledger, Some(e))
            }
        }
    }

    /// A ledger backed by an in-process store, starting empty.
    pub fn open_memory(config: &FacilityConfig) -> Self {
        Self::from_state(config, Arc::new(MemoryStore::new()), FacilityState::default())
    }

    /// Replace the clock used for entry/exit timestamps and overstay checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn from_state(
        config: &FacilityConfig,
        store: Arc<dyn StateStore>,
        state: FacilityState,
    ) -> Self {
        let (totals, state) = reconcile(&config.capacity, state);

        let mut visits = HashMap::new();
        for record in &state.history {
            *visits.entry(normalize_plate(&record.plate)).or_insert(0) += 1;
        }

        Self {
            inner: Arc::new(RwLock::new(Inner {
                totals,
                state,
                visits,
                operator: None,
            })),
            store,
            clock: Arc::new(SystemClock),
            tariffs: Arc::new(config.tariff_table()),
            overstay_hours: config.overstay_hours,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("ledger lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("ledger lock poisoned")
    }

    /// Write the state through to the store. A failure is logged and handed
    /// back; the in-memory state stays authoritative either way.
    fn persist(&self, state: &FacilityState) -> Option<LedgerError> {
        match self.store.save(state) {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("Facility state not persisted: {}", e);
                Some(e)
            }
        }
    }

    // ============================================================
    // Operator
    // ============================================================

    /// Set the operator stamped onto every subsequent exit.
    pub fn login(&self, operator: &str) -> Result<()> {
        let operator = operator.trim();
        if operator.is_empty() {
            return Err(LedgerError::InvalidInput(
                "operator name must not be empty".to_string(),
            ));
        }
        self.write().operator = Some(operator.to_string());
        tracing::info!("Operator '{}' logged in", operator);
        Ok(())
    }

    pub fn current_operator(&self) -> Option<String> {
        self.read().operator.clone()
    }

    // ============================================================
    // Entry / exit
    // ============================================================

    /// Park a vehicle.
    ///
    /// Rejected without any state change when no slot of the type is free or
    /// the plate is already parked. On success the visit count and tier are
    /// assigned, a slot is taken and the state is written through.
    pub fn register_entry(&self, vehicle: NewVehicle) -> Result<EntryOutcome> {
        let plate = normalize_plate(&vehicle.plate);
        if plate.is_empty() {
            return Err(LedgerError::InvalidInput(
                "plate must not be empty".to_string(),
            ));
        }
        let vehicle_type = vehicle.vehicle_type;

        let mut inner = self.write();

        let available = inner.state.capacity.get(&vehicle_type).copied().unwrap_or(0);
        if available == 0 {
            tracing::info!("Entry of {} rejected: no {} slots", plate, vehicle_type);
            return Err(LedgerError::CapacityExhausted { vehicle_type });
        }
        if inner
            .state
            .active
            .iter()
            .any(|s| s.plate.eq_ignore_ascii_case(&plate))
        {
            return Err(LedgerError::AlreadyParked { plate });
        }

        let visit_count = inner.visits.get(&plate).copied().unwrap_or(0) + 1;
        let session = VehicleSession {
            plate,
            vehicle_type: vehicle_type.clone(),
            entry_time: self.clock.now(),
            customer_tier: effective_tier(vehicle.tier, visit_count),
            visit_count,
            location: vehicle.location,
        };

        let remaining = available - 1;
        inner.state.capacity.insert(vehicle_type.clone(), remaining);
        inner.state.active.push(session.clone());
        let write_failure = self.persist(&inner.state);
        drop(inner);

        tracing::info!(
            "Vehicle {} entered ({}, visit {}, {} slots left)",
            session.plate,
            session.vehicle_type,
            session.visit_count,
            remaining
        );

        let mut alerts = Vec::new();
        if remaining == LOW_CAPACITY_THRESHOLD {
            alerts.push(Alert::LowCapacity { vehicle_type });
        }
        if session.customer_tier == CustomerTier::Frequent {
            alerts.push(Alert::FrequentCustomer {
                plate: session.plate.clone(),
            });
        }

        Ok(EntryOutcome {
            session,
            alerts,
            write_failure,
        })
    }

    /// Check a vehicle out, bill it and move it into history.
    pub fn register_exit(&self, plate: &str) -> Result<ExitOutcome> {
        let plate = normalize_plate(plate);

        let mut inner = self.write();

        let Some(index) = inner
            .state
            .active
            .iter()
            .position(|s| s.plate.eq_ignore_ascii_case(&plate))
        else {
            return Err(LedgerError::SessionNotFound { plate });
        };

        let session = inner.state.active.remove(index);
        let exit_time = self.clock.now();
        let elapsed = exit_time.signed_duration_since(session.entry_time);
        let hours = billed_hours(elapsed.num_seconds());
        let total = self
            .tariffs
            .fee(&session.vehicle_type, hours, session.customer_tier);

        let record = HistoryRecord {
            plate: session.plate,
            vehicle_type: session.vehicle_type,
            customer_tier: session.customer_tier,
            entry_time: session.entry_time,
            exit_time,
            billed_hours: hours,
            total,
            operator: inner.operator.clone(),
            location: session.location,
        };

        *inner
            .state
            .capacity
            .entry(record.vehicle_type.clone())
            .or_insert(0) += 1;
        *inner.visits.entry(normalize_plate(&record.plate)).or_insert(0) += 1;
        inner.state.history.push(record.clone());
        let write_failure = self.persist(&inner.state);
        drop(inner);

        tracing::info!(
            "Vehicle {} exited after {} billed hours, total {}",
            record.plate,
            record.billed_hours,
            record.total
        );

        Ok(ExitOutcome {
            record,
            write_failure,
        })
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn list_active(&self) -> Vec<VehicleSession> {
        self.read().state.active.clone()
    }

    /// Remaining free slots per type.
    pub fn list_capacity(&self) -> BTreeMap<VehicleType, u32> {
        self.read().state.capacity.clone()
    }

    pub fn configured_totals(&self) -> BTreeMap<VehicleType, u32> {
        self.read().totals.clone()
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.read().state.history.clone()
    }

    /// Capacity, parked sessions and history taken under one lock.
    pub fn snapshot(&self) -> FacilityState {
        self.read().state.clone()
    }

    pub fn tariffs(&self) -> &TariffTable {
        &self.tariffs
    }

    /// Overstays (one per session parked past the limit) followed by low
    /// capacity warnings (one per type with exactly one slot left).
    pub fn compute_alerts(&self) -> Vec<Alert> {
        let now = self.clock.now();
        let inner = self.read();

        let overstays = inner
            .state
            .active
            .iter()
            .filter(|s| s.is_overstaying(now, self.overstay_hours))
            .map(|s| Alert::Overstay {
                plate: s.plate.clone(),
                hours: self.overstay_hours,
            });

        let low = inner
            .state
            .capacity
            .iter()
            .filter(|(_, free)| **free == LOW_CAPACITY_THRESHOLD)
            .map(|(vehicle_type, _)| Alert::LowCapacity {
                vehicle_type: vehicle_type.clone(),
            });

        overstays.chain(low).collect()
    }

    /// Where a plate is, or was last seen.
    ///
    /// A parked vehicle resolves to its own spot (or nothing, if it was parked
    /// without coordinates). Otherwise the most recent history record for the
    /// plate is used.
    pub fn resolve_location(&self, plate: &str) -> Option<LocatedVehicle> {
        let plate = normalize_plate(plate);
        let inner = self.read();

        if let Some(session) = inner
            .state
            .active
            .iter()
            .find(|s| s.plate.eq_ignore_ascii_case(&plate))
        {
            return session.location.map(|location| LocatedVehicle {
                plate: session.plate.clone(),
                location,
                source: LocationSource::Parked,
            });
        }

        inner
            .state
            .history
            .iter()
            .rev()
            .find(|r| r.matches_plate(&plate))
            .and_then(|r| r.location)
            .map(|location| LocatedVehicle {
                plate,
                location,
                source: LocationSource::LastKnown,
            })
    }
}

/// Derive totals and remaining capacity from the configuration and a loaded
/// document.
///
/// Configured totals win over stored counters. Types that only exist in the
/// document are adopted with their stored size, and a type with more parked
/// vehicles than slots is widened to fit them so the counters stay consistent.
fn reconcile(
    configured: &BTreeMap<VehicleType, u32>,
    mut state: FacilityState,
) -> (BTreeMap<VehicleType, u32>, FacilityState) {
    let occupancy = state.occupancy();
    let mut totals = configured.clone();

    for (vehicle_type, &stored) in &state.capacity {
        if !totals.contains_key(vehicle_type) {
            let parked = occupancy.get(vehicle_type).copied().unwrap_or(0);
            let total = stored.saturating_add(parked);
            tracing::warn!(
                "Vehicle type '{}' is not configured; keeping {} stored slots",
                vehicle_type,
                total
            );
            totals.insert(vehicle_type.clone(), total);
        }
    }

    for (vehicle_type, &parked) in &occupancy {
        let total = totals.entry(vehicle_type.clone()).or_insert(0);
        if parked > *total {
            tracing::warn!(
                "{} {} vehicles parked but only {} slots configured",
                parked,
                vehicle_type,
                total
            );
            *total = parked;
        }
    }

    let mut capacity = BTreeMap::new();
    for (vehicle_type, &total) in &totals {
        let parked = occupancy.get(vehicle_type).copied().unwrap_or(0);
        let free = total - parked;
        if let Some(&stored) = state.capacity.get(vehicle_type) {
            if stored != free {
                tracing::warn!(
                    "Stored capacity for {} was {}, recomputed as {}",
                    vehicle_type,
                    stored,
                    free
                );
            }
        }
        capacity.insert(vehicle_type.clone(), free);
    }

    state.capacity = capacity;
    (totals, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(plate: &str, vehicle_type: VehicleType) -> VehicleSession {
        VehicleSession {
            plate: plate.to_string(),
            vehicle_type,
            entry_time: timestamp::parse("2024-01-01 08:00:00").unwrap(),
            customer_tier: CustomerTier::Normal,
            visit_count: 1,
            location: None,
        }
    }

    #[test]
    fn reconcile_fresh_state_uses_configured_totals() {
        let configured = BTreeMap::from([(VehicleType::Car, 3), (VehicleType::Bicycle, 2)]);
        let (totals, state) = reconcile(&configured, FacilityState::default());
        assert_eq!(totals, configured);
        assert_eq!(state.capacity, configured);
    }

    #[test]
    fn reconcile_recomputes_stale_counters() {
        let configured = BTreeMap::from([(VehicleType::Car, 3)]);
        let stored = FacilityState {
            capacity: BTreeMap::from([(VehicleType::Car, 3)]),
            active: vec![session("AAA1", VehicleType::Car)],
            history: vec![],
        };
        let (_, state) = reconcile(&configured, stored);
        assert_eq!(state.capacity[&VehicleType::Car], 2);
    }

    #[test]
    fn reconcile_adopts_unconfigured_types() {
        let truck = VehicleType::parse("truck");
        let stored = FacilityState {
            capacity: BTreeMap::from([(truck.clone(), 1)]),
            active: vec![session("TRK1", truck.clone())],
            history: vec![],
        };
        let (totals, state) = reconcile(&BTreeMap::new(), stored);
        assert_eq!(totals[&truck], 2);
        assert_eq!(state.capacity[&truck], 1);
    }

    #[test]
    fn reconcile_widens_overfull_types() {
        let configured = BTreeMap::from([(VehicleType::Car, 1)]);
        let stored = FacilityState {
            capacity: BTreeMap::new(),
            active: vec![
                session("AAA1", VehicleType::Car),
                session("AAA2", VehicleType::Car),
            ],
            history: vec![],
        };
        let (totals, state) = reconcile(&configured, stored);
        assert_eq!(totals[&VehicleType::Car], 2);
        assert_eq!(state.capacity[&VehicleType::Car], 0);
    }

    #[test]
    fn reconcile_caps_oversized_stored_counters() {
        let truck = VehicleType::parse("truck");
        let stored = FacilityState {
            capacity: BTreeMap::from([(truck.clone(), u32::MAX)]),
            active: vec![session("TRK1", truck.clone())],
            history: vec![],
        };
        let (totals, state) = reconcile(&BTreeMap::new(), stored);
        assert_eq!(totals[&truck], u32::MAX);
        assert_eq!(state.capacity[&truck], u32::MAX - 1);
    }
}
