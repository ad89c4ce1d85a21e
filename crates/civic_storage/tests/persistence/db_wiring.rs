#![forbid(unsafe_code)]

use std::fs;

use chrono::{TimeZone, Utc};
use civic_contracts::asset::{AssetInput, AssetStatus};
use civic_contracts::directory::AccountRequestInput;
use civic_contracts::maintenance::{MaintenanceInput, MaintenanceStatus, MaintenanceType};
use civic_storage::directory::DirectoryStore;
use civic_storage::ledger::LedgerStore;
use civic_storage::persistence::{
    DirectoryPersistence, JsonFilePersistence, LedgerPersistence, PersistenceMode,
};

fn asset_input(name: &str, status: AssetStatus) -> AssetInput {
    AssetInput {
        name: name.to_string(),
        category: "Furniture".to_string(),
        status,
        department: "Clerk".to_string(),
        assigned_to: None,
        purchase_date: "2019-09-09".to_string(),
        notes: "Room 4".to_string(),
        location: "City Hall".to_string(),
    }
}

#[test]
fn at_persist_01_ledger_survives_reopen_and_allocator_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let persistence = JsonFilePersistence::open(dir.path()).unwrap();
        let mut store = LedgerStore::open(Box::new(persistence));
        let desk = store
            .create_asset(asset_input("Desk", AssetStatus::PendingDisposal))
            .unwrap();
        store
            .create_maintenance_record(MaintenanceInput {
                asset_id: desk.id.clone(),
                asset_name: String::new(),
                maintenance_type: MaintenanceType::Corrective,
                status: MaintenanceStatus::Scheduled,
                scheduled_date: "2023-06-15".to_string(),
                completed_date: None,
                assigned_to: String::new(),
                description: "Fix drawer".to_string(),
                notes: String::new(),
            })
            .unwrap();
        store.snapshot().clone()
    };

    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    let mut store = LedgerStore::open(Box::new(persistence));
    assert_eq!(store.snapshot(), &created);
    assert_eq!(store.next_id_value(), 10003);
    let chair = store
        .create_asset(asset_input("Chair", AssetStatus::InStorage))
        .unwrap();
    assert_eq!(chair.id.as_str(), "10003");
}

#[test]
fn at_persist_02_asset_status_is_stored_in_persisted_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    let ledger_path = persistence.ledger_path().to_path_buf();
    let mut store = LedgerStore::open(Box::new(persistence));
    store
        .create_asset(asset_input("Desk", AssetStatus::PendingDisposal))
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(ledger_path).unwrap()).unwrap();
    assert_eq!(raw["schemaVersion"], 1);
    assert_eq!(raw["assets"][0]["status"], "disposal_pending");
    assert_eq!(raw["assets"][0]["purchaseDate"], "2019-09-09");
}

#[test]
fn at_persist_03_unknown_status_loads_as_in_storage() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    fs::write(
        persistence.ledger_path(),
        r#"{
            "schemaVersion": 1,
            "assets": [
                {"id": "10007", "name": "Bench", "category": "Parks", "status": "retired",
                 "department": "Parks", "purchaseDate": "2018-04-01"},
                {"id": "10008", "name": "Mower", "category": "Parks", "status": "active",
                 "department": "Parks", "assignedTo": "Sam", "purchaseDate": "2018-04-01"}
            ]
        }"#,
    )
    .unwrap();
    let snapshot = persistence.load_snapshot().into_snapshot();
    assert_eq!(snapshot.assets[0].status, AssetStatus::InStorage);
    assert_eq!(snapshot.assets[1].status, AssetStatus::InUse);
    assert_eq!(snapshot.assets[1].assigned_to.as_deref(), Some("Sam"));
}

#[test]
fn at_persist_04_corrupt_collection_is_dropped_alone() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    fs::write(
        persistence.ledger_path(),
        r#"{
            "schemaVersion": 1,
            "assets": [
                {"id": "10001", "name": "Bench", "category": "Parks", "status": "inactive",
                 "department": "Parks", "purchaseDate": "2018-04-01"}
            ],
            "assignments": "this is not a list",
            "transfers": [],
            "maintenanceRecords": [{"id": 5}]
        }"#,
    )
    .unwrap();
    let store = LedgerStore::open(Box::new(persistence));
    assert_eq!(store.assets().len(), 1);
    assert!(store.assignments().is_empty());
    assert!(store.maintenance_records().is_empty());
    assert_eq!(store.next_id_value(), 10002);
}

#[test]
fn at_persist_05_invalid_document_or_version_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    fs::write(persistence.ledger_path(), "{ not json").unwrap();
    let loaded = persistence.load_snapshot();
    assert!(loaded.degraded);
    assert_eq!(loaded.snapshot.row_count(), 0);

    fs::write(
        persistence.ledger_path(),
        r#"{"schemaVersion": 99, "assets": []}"#,
    )
    .unwrap();
    let loaded = persistence.load_snapshot();
    assert!(loaded.degraded);
    assert_eq!(loaded.snapshot.row_count(), 0);
}

#[test]
fn at_persist_06_directory_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2023, 5, 1, 9, 0, 0).unwrap();
    let expected = {
        let mut store = DirectoryStore::open(Box::new(JsonFilePersistence::open(dir.path()).unwrap()));
        store
            .create_account_request(
                AccountRequestInput {
                    first_name: "Jane".to_string(),
                    last_name: "Doe".to_string(),
                    email: "jane@x.com".to_string(),
                    department: "Parks".to_string(),
                    job_title: String::new(),
                    reason: String::new(),
                },
                now,
            )
            .unwrap();
        store.seed_admin("admin@city.gov", "change-me-now", now).unwrap();
        store.snapshot().clone()
    };
    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    assert!(persistence.directory_path().exists());
    let reopened = DirectoryStore::open(Box::new(persistence));
    assert_eq!(reopened.snapshot(), &expected);
    assert!(reopened.authenticate("admin@city.gov", "change-me-now").is_ok());
}

#[test]
fn at_persist_07_mode_parsing() {
    assert_eq!(PersistenceMode::parse("FILE"), Some(PersistenceMode::File));
    assert_eq!(PersistenceMode::parse(" mock "), Some(PersistenceMode::Memory));
    assert_eq!(PersistenceMode::parse("remote"), None);
    assert_eq!(PersistenceMode::Memory.as_str(), "memory");
}

#[test]
fn at_persist_08_degraded_reload_keeps_live_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    let mut store = LedgerStore::open(Box::new(persistence.clone()));
    for name in ["Desk", "Chair", "Lamp"] {
        store
            .create_asset(asset_input(name, AssetStatus::InStorage))
            .unwrap();
    }
    fs::write(persistence.ledger_path(), "{garbage").unwrap();

    assert!(!store.reload());
    assert_eq!(store.assets().len(), 3);
    assert_eq!(store.next_id_value(), 10004);

    store
        .create_asset(asset_input("Shelf", AssetStatus::InStorage))
        .unwrap();
    let on_disk = persistence.load_snapshot();
    assert!(!on_disk.degraded);
    assert_eq!(on_disk.snapshot.assets.len(), 4);
}

#[test]
fn at_persist_09_corrupt_collection_flags_load_and_blocks_reload() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::open(dir.path()).unwrap();
    let mut store = DirectoryStore::open(Box::new(persistence.clone()));
    store
        .create_account_request(
            AccountRequestInput {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane@x.com".to_string(),
                department: "Parks".to_string(),
                job_title: String::new(),
                reason: "Field inventory".to_string(),
            },
            Utc.with_ymd_and_hms(2023, 5, 1, 9, 0, 0).unwrap(),
        )
        .unwrap();
    fs::write(
        persistence.directory_path(),
        r#"{"schemaVersion": 1, "users": [], "departments": [], "accountRequests": 7}"#,
    )
    .unwrap();

    assert!(persistence.load_directory().degraded);
    assert!(!store.reload());
    assert_eq!(store.account_requests(None).len(), 1);
}
