use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use parking_ledger::config::FacilityConfig;
use parking_ledger::ledger::Ledger;
use parking_ledger::models::*;
use parking_ledger::store::{JsonFileStore, StateStore};
use parking_ledger::LedgerError;
use tempfile::TempDir;

fn setup() -> (TempDir, JsonFileStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = JsonFileStore::new(dir.path().join("parking.json"));
    (dir, store)
}

fn sample_state() -> FacilityState {
    FacilityState {
        capacity: BTreeMap::from([
            (VehicleType::Car, 48),
            (VehicleType::Motorcycle, 80),
            (VehicleType::parse("scooter"), 3),
        ]),
        active: vec![
            VehicleSession {
                plate: "ABC123".to_string(),
                vehicle_type: VehicleType::Car,
                entry_time: timestamp::parse("2024-06-01 08:15:42").unwrap(),
                customer_tier: CustomerTier::Frequent,
                visit_count: 7,
                location: Some(Location::new(6.2612345, -75.5678901)),
            },
            VehicleSession {
                plate: "XYZ9".to_string(),
                vehicle_type: VehicleType::Car,
                entry_time: timestamp::parse("2024-06-01 09:00:00").unwrap(),
                customer_tier: CustomerTier::Normal,
                visit_count: 1,
                location: None,
            },
        ],
        history: vec![HistoryRecord {
            plate: "MOTO1".to_string(),
            vehicle_type: VehicleType::Motorcycle,
            customer_tier: CustomerTier::Monthly,
            entry_time: timestamp::parse("2024-05-31 18:00:00").unwrap(),
            exit_time: timestamp::parse("2024-06-01 07:59:59").unwrap(),
            billed_hours: 13,
            total: 0.0,
            operator: Some("ana".to_string()),
            location: None,
        }],
    }
}

mod json_file_store {
    use super::*;

    #[test]
    fn round_trips_the_full_state() {
        let (_dir, store) = setup();
        let state = sample_state();

        store.save(&state).expect("save");
        let loaded = store.load().expect("load");

        assert_eq!(loaded, state);
    }

    #[test]
    fn absent_file_is_a_fresh_start() {
        let (_dir, store) = setup();
        assert_eq!(store.load().expect("load"), FacilityState::default());
    }

    #[test]
    fn writes_the_documented_layout() {
        let (_dir, store) = setup();
        store.save(&sample_state()).expect("save");

        let raw = fs::read_to_string(store.path()).expect("read");
        let doc: serde_json::Value = serde_json::from_str(&raw).expect("json");

        assert_eq!(doc["capacity"]["car"], 48);
        assert_eq!(doc["capacity"]["scooter"], 3);

        let parked = &doc["active"][0];
        assert_eq!(parked["plate"], "ABC123");
        assert_eq!(parked["type"], "car");
        assert_eq!(parked["entryTime"], "2024-06-01 08:15:42");
        assert_eq!(parked["customerTier"], "frequent");
        assert_eq!(parked["visitCount"], 7);
        assert_eq!(parked["lat"], 6.2612345);
        assert_eq!(parked["lon"], -75.5678901);
        assert!(doc["active"][1].get("lat").is_none());
        assert!(doc["active"][1].get("lon").is_none());

        let record = &doc["history"][0];
        assert_eq!(record["exitTime"], "2024-06-01 07:59:59");
        assert_eq!(record["billedHours"], 13);
        assert_eq!(record["total"], 0.0);
        assert_eq!(record["operator"], "ana");
        assert_eq!(record["customerTier"], "monthly");
    }

    #[test]
    fn overwrites_previous_content_without_leaving_temp_files() {
        let (dir, store) = setup();
        store.save(&sample_state()).expect("save");
        store.save(&FacilityState::default()).expect("save");

        assert_eq!(store.load().expect("load"), FacilityState::default());
        let names: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["parking.json".to_string()]);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path().join("data/nested/parking.json"));

        store.save(&sample_state()).expect("save");

        assert!(store.path().exists());
    }

    #[test]
    fn malformed_document_is_corrupt() {
        let (_dir, store) = setup();
        fs::write(store.path(), "{ \"capacity\": ").expect("write");

        let err = store.load().unwrap_err();

        assert!(matches!(err, LedgerError::PersistenceCorrupt { .. }));
    }

    #[test]
    fn bad_timestamp_is_corrupt() {
        let (_dir, store) = setup();
        fs::write(
            store.path(),
            r#"{"capacity":{},"active":[{"plate":"A","type":"car","entryTime":"2024-06-01T08:00:00","customerTier":"normal","visitCount":1}],"history":[]}"#,
        )
        .expect("write");

        assert!(matches!(
            store.load(),
            Err(LedgerError::PersistenceCorrupt { .. })
        ));
    }

    #[test]
    fn half_coordinate_is_corrupt() {
        let (_dir, store) = setup();
        fs::write(
            store.path(),
            r#"{"capacity":{},"active":[{"plate":"A","type":"car","entryTime":"2024-06-01 08:00:00","lat":6.25}],"history":[]}"#,
        )
        .expect("write");

        assert!(matches!(
            store.load(),
            Err(LedgerError::PersistenceCorrupt { .. })
        ));
    }

    #[test]
    fn non_numeric_history_coordinate_is_corrupt() {
        let (_dir, store) = setup();
        fs::write(
            store.path(),
            r#"{"capacity":{},"active":[],"history":[{"plate":"A","type":"car","entryTime":"2024-06-01 08:00:00","exitTime":"2024-06-01 09:00:00","billedHours":1,"total":2000.0,"lat":"abc","lon":-75.5}]}"#,
        )
        .expect("write");

        assert!(matches!(
            store.load(),
            Err(LedgerError::PersistenceCorrupt { .. })
        ));
    }

    #[test]
    fn directory_in_place_of_file_is_corrupt() {
        let (_dir, store) = setup();
        fs::create_dir_all(store.path()).expect("mkdir");

        assert!(matches!(
            store.load(),
            Err(LedgerError::PersistenceCorrupt { .. })
        ));
    }

    #[test]
    fn loads_legacy_documents() {
        let (_dir, store) = setup();
        fs::write(
            store.path(),
            r#"{
                "cupos": { "carro": 49, "moto": 80, "bici": 20 },
                "vehiculos": [
                    { "placa": "ABC123", "tipo": "carro", "hora_entrada": "2024-06-01 08:00:00",
                      "cliente": "normal", "visitas": 1, "lat": 6.26, "lon": -75.57 }
                ],
                "historial": [
                    { "placa": "QWE456", "tipo": "moto", "cliente": "frecuente",
                      "hora_entrada": "2024-05-30 10:00:00", "hora_salida": "2024-05-30 12:10:00",
                      "horas": 2, "total": 1800.0, "operador": null, "lat": null, "lon": null }
                ]
            }"#,
        )
        .expect("write");

        let state = store.load().expect("load");

        assert_eq!(state.capacity[&VehicleType::Car], 49);
        assert_eq!(state.capacity[&VehicleType::Bicycle], 20);
        assert_eq!(state.active[0].plate, "ABC123");
        assert_eq!(state.active[0].location, Some(Location::new(6.26, -75.57)));
        let record = &state.history[0];
        assert_eq!(record.vehicle_type, VehicleType::Motorcycle);
        assert_eq!(record.customer_tier, CustomerTier::Frequent);
        assert_eq!(record.billed_hours, 2);
        assert!(record.operator.is_none());
        assert!(record.location.is_none());
    }

    #[test]
    fn quarantine_moves_the_document_aside() {
        let (dir, store) = setup();
        fs::write(store.path(), "garbage").expect("write");

        let moved = store.quarantine().expect("quarantine").expect("moved");

        assert!(!store.path().exists());
        assert_eq!(fs::read_to_string(&moved).expect("read"), "garbage");
        assert!(moved.starts_with(dir.path()));
        let name = moved.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("parking.json.corrupt-"));
    }

    #[test]
    fn repeated_quarantine_keeps_every_document() {
        let (dir, store) = setup();
        fs::write(store.path(), "first").expect("write");
        let first = store.quarantine().expect("quarantine").expect("moved");
        fs::write(store.path(), "second").expect("write");
        let second = store.quarantine().expect("quarantine").expect("moved");

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).expect("read"), "first");
        assert_eq!(fs::read_to_string(&second).expect("read"), "second");
        let quarantined = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(quarantined, 2);
    }

    #[test]
    fn quarantine_without_document_does_nothing() {
        let (_dir, store) = setup();
        assert!(store.quarantine().expect("quarantine").is_none());
    }
}

mod ledger_on_disk {
    use super::*;

    fn config() -> FacilityConfig {
        FacilityConfig {
            capacity: BTreeMap::from([(VehicleType::Car, 2), (VehicleType::Bicycle, 1)]),
            ..FacilityConfig::default()
        }
    }

    #[test]
    fn state_survives_a_restart() {
        let (_dir, store) = setup();
        let path = store.path().to_path_buf();

        let ledger = Ledger::open(&config(), Arc::new(store)).expect("open");
        ledger.login("ana").expect("login");
        ledger
            .register_entry(
                NewVehicle::new("AAA1", VehicleType::Car).with_location(Location::new(6.25, -75.56)),
            )
            .expect("entry");
        ledger
            .register_entry(NewVehicle::new("BBB2", VehicleType::Car))
            .expect("entry");
        ledger.register_exit("BBB2").expect("exit");
        let before = ledger.snapshot();
        drop(ledger);

        let reopened = Ledger::open(&config(), Arc::new(JsonFileStore::new(path))).expect("reopen");

        assert_eq!(reopened.snapshot(), before);
        assert_eq!(reopened.list_capacity()[&VehicleType::Car], 1);
        assert_eq!(reopened.history()[0].operator.as_deref(), Some("ana"));
        assert!(reopened.current_operator().is_none());
    }

    #[test]
    fn configured_totals_win_over_stored_counters() {
        let (_dir, store) = setup();
        let stale = FacilityState {
            capacity: BTreeMap::from([(VehicleType::Car, 40)]),
            ..FacilityState::default()
        };
        store.save(&stale).expect("save");

        let ledger = Ledger::open(&config(), Arc::new(store)).expect("open");

        assert_eq!(ledger.list_capacity()[&VehicleType::Car], 2);
        assert_eq!(ledger.list_capacity()[&VehicleType::Bicycle], 1);
    }

    #[test]
    fn recovering_from_corruption_preserves_the_bad_file() {
        let (dir, store) = setup();
        fs::write(store.path(), "not json at all").expect("write");
        let path = store.path().to_path_buf();

        let (ledger, error) = Ledger::open_or_recover(&config(), Arc::new(store));
        assert!(matches!(error, Some(LedgerError::PersistenceCorrupt { .. })));

        ledger
            .register_entry(NewVehicle::new("AAA1", VehicleType::Car))
            .expect("entry");

        let fresh = JsonFileStore::new(&path).load().expect("load");
        assert_eq!(fresh.active.len(), 1);
        let quarantined = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(quarantined, 1);
    }

    #[test]
    fn unwritable_target_reports_but_keeps_the_entry() {
        let (dir, _) = setup();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").expect("write");
        let store = JsonFileStore::new(blocker.join("parking.json"));

        let ledger = Ledger::open(&config(), Arc::new(store)).expect("open");
        let outcome = ledger
            .register_entry(NewVehicle::new("AAA1", VehicleType::Car))
            .expect("entry");

        assert!(matches!(
            outcome.write_failure,
            Some(LedgerError::PersistenceWriteFailed { .. })
        ));
        assert_eq!(ledger.list_active().len(), 1);
    }
}
