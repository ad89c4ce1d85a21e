#![forbid(unsafe_code)]

use civic_contracts::asset::{Asset, AssetInput, AssetPatch, AssetStatus};
use civic_contracts::assignment::{Assignment, AssignmentInput, AssignmentPatch, AssignmentStatus};
use civic_contracts::maintenance::{
    MaintenanceInput, MaintenanceStatus, MaintenanceType,
};
use civic_contracts::transfer::{TransferInput, TransferStatus};
use civic_contracts::RecordId;
use civic_storage::ledger::LedgerStore;
use civic_storage::persistence::InMemoryPersistence;
use civic_storage::snapshot::{DirectorySnapshot, LedgerSnapshot};
use civic_storage::StorageError;

fn asset_input(name: &str, status: AssetStatus, assigned_to: Option<&str>) -> AssetInput {
    AssetInput {
        name: name.to_string(),
        category: "Vehicles".to_string(),
        status,
        department: "Public Works".to_string(),
        assigned_to: assigned_to.map(str::to_string),
        purchase_date: "2021-03-15".to_string(),
        notes: String::new(),
        location: "Depot 2".to_string(),
    }
}

fn assignment_input(asset_id: &RecordId, who: &str) -> AssignmentInput {
    AssignmentInput {
        asset_id: asset_id.clone(),
        asset_name: String::new(),
        assigned_to: who.to_string(),
        department: "Public Works".to_string(),
        assigned_date: "2023-01-02".to_string(),
        due_date: None,
        status: AssignmentStatus::Active,
        notes: String::new(),
    }
}

fn maintenance_input(asset_id: &RecordId, scheduled: &str) -> MaintenanceInput {
    MaintenanceInput {
        asset_id: asset_id.clone(),
        asset_name: String::new(),
        maintenance_type: MaintenanceType::Preventive,
        status: MaintenanceStatus::Scheduled,
        scheduled_date: scheduled.to_string(),
        completed_date: None,
        assigned_to: "Fleet Shop".to_string(),
        description: "Oil change".to_string(),
        notes: String::new(),
    }
}

fn transfer_input(asset_id: &RecordId) -> TransferInput {
    TransferInput {
        asset_id: asset_id.clone(),
        asset_name: String::new(),
        from_user: "Dana".to_string(),
        to_user: "Lee".to_string(),
        from_department: "Public Works".to_string(),
        to_department: "Parks".to_string(),
        transfer_date: "2023-02-01".to_string(),
        approved_by: "Director".to_string(),
        status: TransferStatus::Pending,
        notes: String::new(),
    }
}

#[test]
fn at_ledger_01_create_then_get_round_trip_and_allocator_advances() {
    let mut store = LedgerStore::new_in_memory();
    let created = store
        .create_asset(asset_input("Dump Truck", AssetStatus::InStorage, None))
        .unwrap();
    assert_eq!(created.id.as_str(), "10001");
    assert_eq!(store.asset(&created.id), Some(&created));
    assert!(store.next_id_value() > created.id.as_number().unwrap());

    let second = store
        .create_asset(asset_input("Sweeper", AssetStatus::InStorage, None))
        .unwrap();
    assert_eq!(second.id.as_str(), "10002");
}

#[test]
fn at_ledger_02_ids_are_shared_across_record_kinds() {
    let mut store = LedgerStore::new_in_memory();
    let asset = store
        .create_asset(asset_input("Dump Truck", AssetStatus::InStorage, None))
        .unwrap();
    let assignment = store
        .create_assignment(assignment_input(&asset.id, "Dana"))
        .unwrap();
    let transfer = store.create_transfer(transfer_input(&asset.id)).unwrap();
    let record = store
        .create_maintenance_record(maintenance_input(&asset.id, "2023-05-10"))
        .unwrap();
    assert_eq!(assignment.id.as_str(), "10002");
    assert_eq!(transfer.id.as_str(), "10003");
    assert_eq!(record.id.as_str(), "10004");
    assert_eq!(assignment.asset_name, "Dump Truck");
    assert_eq!(transfer.asset_name, "Dump Truck");
    assert_eq!(record.asset_name, "Dump Truck");
}

#[test]
fn at_ledger_03_delete_asset_cascades_and_is_idempotent() {
    let mut store = LedgerStore::new_in_memory();
    let keep = store
        .create_asset(asset_input("Sweeper", AssetStatus::InStorage, None))
        .unwrap();
    let doomed = store
        .create_asset(asset_input("Dump Truck", AssetStatus::InStorage, None))
        .unwrap();
    store
        .create_assignment(assignment_input(&doomed.id, "Dana"))
        .unwrap();
    store.create_transfer(transfer_input(&doomed.id)).unwrap();
    store
        .create_maintenance_record(maintenance_input(&doomed.id, "2023-05-10"))
        .unwrap();
    let kept_record = store
        .create_maintenance_record(maintenance_input(&keep.id, "2023-06-10"))
        .unwrap();

    assert!(store.delete_asset(&doomed.id).unwrap());
    assert!(store.asset(&doomed.id).is_none());
    assert!(store.assignments().iter().all(|r| r.asset_id != doomed.id));
    assert!(store.transfers().iter().all(|r| r.asset_id != doomed.id));
    assert!(store
        .maintenance_records()
        .iter()
        .all(|r| r.asset_id != doomed.id));
    assert_eq!(store.maintenance_records(), &[kept_record]);

    let before = store.snapshot().clone();
    assert!(!store.delete_asset(&doomed.id).unwrap());
    assert_eq!(store.snapshot(), &before);
}

#[test]
fn at_ledger_04_deleting_asset_10005_removes_assignment_10013() {
    let mut snapshot = LedgerSnapshot::default();
    for n in 10001..=10005u64 {
        snapshot.assets.push(Asset {
            id: RecordId::from_number(n),
            name: format!("Asset {n}"),
            category: "IT".to_string(),
            status: AssetStatus::InUse,
            department: "Finance".to_string(),
            assigned_to: Some("Pat".to_string()),
            purchase_date: "2020-01-01".to_string(),
            notes: String::new(),
            location: String::new(),
        });
    }
    snapshot.assignments.push(Assignment {
        id: RecordId::from_number(10013),
        asset_id: RecordId::from_number(10005),
        asset_name: "Asset 10005".to_string(),
        assigned_to: "Pat".to_string(),
        department: "Finance".to_string(),
        assigned_date: "2022-08-01".to_string(),
        due_date: None,
        status: AssignmentStatus::Active,
        notes: String::new(),
    });
    let persistence = InMemoryPersistence::seeded(snapshot, DirectorySnapshot::default());
    let mut store = LedgerStore::open(Box::new(persistence.clone()));
    assert_eq!(store.next_id_value(), 10014);

    assert!(store.delete_asset(&RecordId::from_number(10005)).unwrap());
    assert!(store.assignment(&RecordId::from_number(10013)).is_none());
    assert_eq!(store.assets().len(), 4);
    assert_eq!(persistence.ledger_save_count(), 1);
}

#[test]
fn at_ledger_05_rename_propagates_to_assignments_and_maintenance() {
    let mut store = LedgerStore::new_in_memory();
    let asset = store
        .create_asset(asset_input("Dump Truck", AssetStatus::InStorage, None))
        .unwrap();
    let assignment = store
        .create_assignment(assignment_input(&asset.id, "Dana"))
        .unwrap();
    let record = store
        .create_maintenance_record(maintenance_input(&asset.id, "2023-05-10"))
        .unwrap();

    store
        .update_asset(
            &asset.id,
            AssetPatch {
                name: Some("Dump Truck #7".to_string()),
                department: Some("Parks".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let assignment = store.assignment(&assignment.id).unwrap();
    assert_eq!(assignment.asset_name, "Dump Truck #7");
    assert_eq!(assignment.department, "Parks");
    assert_eq!(assignment.assigned_to, "Dana");
    assert_eq!(
        store.maintenance_record(&record.id).unwrap().asset_name,
        "Dump Truck #7"
    );
}

#[test]
fn at_ledger_06_failed_save_leaves_state_untouched() {
    let persistence = InMemoryPersistence::default();
    let mut store = LedgerStore::open(Box::new(persistence.clone()));
    let asset = store
        .create_asset(asset_input("Dump Truck", AssetStatus::InStorage, None))
        .unwrap();
    let before = store.snapshot().clone();

    persistence.set_fail_saves(true);
    let err = store
        .create_asset(asset_input("Sweeper", AssetStatus::InStorage, None))
        .unwrap_err();
    assert!(matches!(err, StorageError::Persistence { .. }));
    assert!(store
        .update_asset(
            &asset.id,
            AssetPatch {
                name: Some("Renamed".to_string()),
                ..Default::default()
            }
        )
        .is_err());
    assert!(store.delete_asset(&asset.id).is_err());
    assert_eq!(store.snapshot(), &before);

    persistence.set_fail_saves(false);
    let next = store
        .create_asset(asset_input("Sweeper", AssetStatus::InStorage, None))
        .unwrap();
    assert_eq!(next.id.as_str(), "10003");
}

#[test]
fn at_ledger_07_update_of_missing_row_is_not_found() {
    let mut store = LedgerStore::new_in_memory();
    let err = store
        .update_assignment(&RecordId::from_number(10999), AssignmentPatch::default())
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::NotFound {
            table: "assignments",
            key: "10999".to_string(),
        }
    );
    assert!(!store
        .delete_transfer(&RecordId::from_number(10999))
        .unwrap());
}

#[test]
fn at_ledger_08_in_use_asset_with_assignee_gets_one_active_assignment() {
    let mut store = LedgerStore::new_in_memory();
    let asset = store
        .create_asset(asset_input("Laptop", AssetStatus::InUse, Some("Dana")))
        .unwrap();
    let active: Vec<_> = store
        .assignments()
        .iter()
        .filter(|r| r.asset_id == asset.id && r.status == AssignmentStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].assigned_to, "Dana");

    store
        .update_asset(
            &asset.id,
            AssetPatch {
                notes: Some("new battery".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(store.assignments().len(), 1);

    store
        .update_asset(
            &asset.id,
            AssetPatch {
                assigned_to: Some(Some("Lee".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(store
        .assignments()
        .iter()
        .any(|r| r.assigned_to == "Lee" && r.status == AssignmentStatus::Active));
}

#[test]
fn at_ledger_09_invalid_input_is_rejected_before_allocation() {
    let mut store = LedgerStore::new_in_memory();
    let mut input = asset_input("Dump Truck", AssetStatus::InStorage, None);
    input.purchase_date = "someday".to_string();
    assert!(matches!(
        store.create_asset(input),
        Err(StorageError::ContractViolation(_))
    ));
    assert_eq!(store.next_id_value(), 10001);
    assert!(store.assets().is_empty());
}
