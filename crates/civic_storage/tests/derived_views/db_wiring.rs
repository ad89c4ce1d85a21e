#![forbid(unsafe_code)]

use chrono::NaiveDate;
use civic_contracts::asset::{Asset, AssetStatus};
use civic_contracts::maintenance::{MaintenanceRecord, MaintenanceStatus, MaintenanceType};
use civic_contracts::RecordId;
use civic_storage::snapshot::LedgerSnapshot;
use civic_storage::views::{
    available_assets, count_by_department, count_by_status, dashboard_summary, is_available,
    overdue_maintenance_records, unparseable_maintenance_dates, upcoming_maintenance_records,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn asset(id: u64, status: AssetStatus, department: &str, assigned_to: Option<&str>) -> Asset {
    Asset {
        id: RecordId::from_number(id),
        name: format!("Asset {id}"),
        category: "Equipment".to_string(),
        status,
        department: department.to_string(),
        assigned_to: assigned_to.map(str::to_string),
        purchase_date: "2021-01-01".to_string(),
        notes: String::new(),
        location: String::new(),
    }
}

fn record(id: u64, asset_id: u64, scheduled: &str, status: MaintenanceStatus) -> MaintenanceRecord {
    MaintenanceRecord {
        id: RecordId::from_number(id),
        asset_id: RecordId::from_number(asset_id),
        asset_name: format!("Asset {asset_id}"),
        maintenance_type: MaintenanceType::Inspection,
        status,
        scheduled_date: scheduled.to_string(),
        completed_date: None,
        assigned_to: String::new(),
        description: "Annual inspection".to_string(),
        notes: String::new(),
    }
}

fn ids(records: &[&MaintenanceRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.to_string()).collect()
}

fn mixed_snapshot() -> LedgerSnapshot {
    LedgerSnapshot {
        assets: vec![
            asset(10001, AssetStatus::InUse, "Finance", Some("John")),
            asset(10002, AssetStatus::InUse, "Finance", None),
            asset(10003, AssetStatus::InStorage, "Parks", Some("Stale")),
            asset(10004, AssetStatus::InMaintenance, "Parks", None),
            asset(10005, AssetStatus::PendingDisposal, "Clerk", None),
            asset(10006, AssetStatus::PendingAssignment, "Clerk", None),
        ],
        ..Default::default()
    }
}

#[test]
fn at_views_01_status_counts_have_four_keys_summing_to_total() {
    let snapshot = mixed_snapshot();
    let counts = count_by_status(&snapshot);
    assert_eq!(counts.len(), 4);
    assert_eq!(counts.values().sum::<usize>(), snapshot.assets.len());
    assert_eq!(counts[&AssetStatus::InUse], 2);
    assert_eq!(counts[&AssetStatus::InStorage], 2);
    assert_eq!(counts[&AssetStatus::InMaintenance], 1);
    assert_eq!(counts[&AssetStatus::PendingDisposal], 1);

    let empty = count_by_status(&LedgerSnapshot::default());
    assert_eq!(empty.len(), 4);
    assert!(empty.values().all(|n| *n == 0));
}

#[test]
fn at_views_02_department_counts_cover_present_departments_only() {
    let counts = count_by_department(&mixed_snapshot());
    assert_eq!(counts.len(), 3);
    assert_eq!(counts["Finance"], 2);
    assert_eq!(counts["Parks"], 2);
    assert_eq!(counts["Clerk"], 2);
}

#[test]
fn at_views_03_availability_rule() {
    let snapshot = mixed_snapshot();
    let available: Vec<&str> = available_assets(&snapshot)
        .iter()
        .map(|a| a.id.as_str())
        .collect();
    // Unassigned InUse (10002) is available; stale assignee on stock (10003) too.
    assert_eq!(available, vec!["10002", "10003", "10006"]);

    let mut disposal = asset(10010, AssetStatus::PendingDisposal, "Clerk", None);
    assert!(!is_available(&disposal));
    disposal.assigned_to = Some("Someone".to_string());
    assert!(!is_available(&disposal));
}

#[test]
fn at_views_04_overdue_never_contains_closed_records() {
    let snapshot = LedgerSnapshot {
        maintenance_records: vec![
            record(10020, 10001, "2023-01-10", MaintenanceStatus::Completed),
            record(10021, 10001, "2023-01-10", MaintenanceStatus::Cancelled),
            record(10022, 10001, "2023-01-10", MaintenanceStatus::InProgress),
            record(10023, 10001, "2023-01-10", MaintenanceStatus::Overdue),
            record(10024, 10001, "2023-03-10", MaintenanceStatus::Scheduled),
        ],
        ..Default::default()
    };
    let overdue = overdue_maintenance_records(&snapshot, day(2023, 2, 1));
    assert_eq!(ids(&overdue), vec!["10022", "10023"]);
    assert!(overdue.iter().all(|r| !r.status.is_closed()));
}

#[test]
fn at_views_05_scheduled_record_moves_from_upcoming_to_overdue() {
    let snapshot = LedgerSnapshot {
        assets: vec![asset(10001, AssetStatus::InUse, "Finance", Some("John"))],
        maintenance_records: vec![record(
            10016,
            10001,
            "2023-06-15",
            MaintenanceStatus::Scheduled,
        )],
        ..Default::default()
    };

    let fifteen_days_ahead = day(2023, 5, 31);
    assert_eq!(
        ids(&upcoming_maintenance_records(&snapshot, fifteen_days_ahead)),
        vec!["10016"]
    );
    assert!(overdue_maintenance_records(&snapshot, fifteen_days_ahead).is_empty());

    // 45 days ahead is outside the window.
    assert!(upcoming_maintenance_records(&snapshot, day(2023, 5, 1)).is_empty());
    // Window edges are inclusive.
    assert_eq!(upcoming_maintenance_records(&snapshot, day(2023, 5, 16)).len(), 1);
    assert_eq!(upcoming_maintenance_records(&snapshot, day(2023, 6, 15)).len(), 1);

    let after = day(2023, 7, 1);
    assert!(upcoming_maintenance_records(&snapshot, after).is_empty());
    assert_eq!(
        ids(&overdue_maintenance_records(&snapshot, after)),
        vec!["10016"]
    );
}

#[test]
fn at_views_06_malformed_dates_are_neither_overdue_nor_upcoming() {
    let snapshot = LedgerSnapshot {
        maintenance_records: vec![
            record(10030, 10001, "next tuesday", MaintenanceStatus::Scheduled),
            record(10031, 10001, "", MaintenanceStatus::InProgress),
            record(10032, 10001, "2023-06-20T09:00:00Z", MaintenanceStatus::Scheduled),
        ],
        ..Default::default()
    };
    let now = day(2023, 6, 1);
    assert_eq!(ids(&upcoming_maintenance_records(&snapshot, now)), vec!["10032"]);
    assert!(overdue_maintenance_records(&snapshot, now).is_empty());
    assert_eq!(
        ids(&unparseable_maintenance_dates(&snapshot)),
        vec!["10030", "10031"]
    );
}

#[test]
fn at_views_07_dashboard_summary_agrees_with_individual_views() {
    let mut snapshot = mixed_snapshot();
    snapshot.maintenance_records = vec![
        record(10040, 10004, "2023-06-10", MaintenanceStatus::Scheduled),
        record(10041, 10004, "2023-04-10", MaintenanceStatus::Scheduled),
    ];
    let now = day(2023, 6, 1);
    let summary = dashboard_summary(&snapshot, now);
    assert_eq!(summary.as_of, now);
    assert_eq!(summary.total_assets, 6);
    assert_eq!(summary.active_assets, 2);
    assert_eq!(summary.storage_assets, 2);
    assert_eq!(summary.maintenance_due_assets, 1);
    assert_eq!(summary.disposal_pending_assets, 1);
    assert_eq!(summary.available_assets, 3);
    assert_eq!(summary.by_status, count_by_status(&snapshot));
    assert_eq!(summary.upcoming_maintenance.len(), 1);
    assert_eq!(summary.overdue_maintenance.len(), 1);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["byStatus"]["In Use"], 2);
    assert_eq!(json["byStatus"]["In Storage"], json["storageAssets"]);
    assert_eq!(json["totalAssets"], 6);
}
