#![forbid(unsafe_code)]

//! Pure aggregates over a ledger snapshot. Nothing here caches; every call
//! recomputes from the rows it is handed.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use civic_contracts::asset::{Asset, AssetStatus};
use civic_contracts::common::parse_record_date;
use civic_contracts::maintenance::{MaintenanceRecord, MaintenanceStatus};
use civic_contracts::RecordId;
use serde::Serialize;

use crate::snapshot::LedgerSnapshot;

pub const UPCOMING_WINDOW_DAYS: u64 = 30;

/// Bucket an asset falls into for status counts. Pending-assignment assets
/// are unassigned stock and count as in storage.
fn counted_status(status: AssetStatus) -> AssetStatus {
    match status {
        AssetStatus::PendingAssignment => AssetStatus::InStorage,
        other => other,
    }
}

/// Always exactly the four counted statuses, zero-filled.
pub fn count_by_status(snapshot: &LedgerSnapshot) -> BTreeMap<AssetStatus, usize> {
    let mut out: BTreeMap<AssetStatus, usize> =
        AssetStatus::COUNTED.into_iter().map(|s| (s, 0)).collect();
    for asset in &snapshot.assets {
        *out.entry(counted_status(asset.status)).or_insert(0) += 1;
    }
    out
}

/// Keys are exactly the departments present in the data.
pub fn count_by_department(snapshot: &LedgerSnapshot) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for asset in &snapshot.assets {
        *out.entry(asset.department.clone()).or_insert(0) += 1;
    }
    out
}

/// Counts use the same buckets as `count_by_status`, so the dashboard
/// counters always match its `by_status` map.
fn count_status(snapshot: &LedgerSnapshot, status: AssetStatus) -> usize {
    snapshot
        .assets
        .iter()
        .filter(|a| counted_status(a.status) == status)
        .count()
}

pub fn total_assets(snapshot: &LedgerSnapshot) -> usize {
    snapshot.assets.len()
}

pub fn active_assets(snapshot: &LedgerSnapshot) -> usize {
    count_status(snapshot, AssetStatus::InUse)
}

pub fn storage_assets(snapshot: &LedgerSnapshot) -> usize {
    count_status(snapshot, AssetStatus::InStorage)
}

pub fn maintenance_due_assets(snapshot: &LedgerSnapshot) -> usize {
    count_status(snapshot, AssetStatus::InMaintenance)
}

pub fn disposal_pending_assets(snapshot: &LedgerSnapshot) -> usize {
    count_status(snapshot, AssetStatus::PendingDisposal)
}

/// Availability rule. Pending-disposal assets are never available. Otherwise
/// an asset is available if it is in storage or pending assignment, or if it
/// has no assignee and is not in maintenance. The last clause makes an
/// unassigned `InUse` asset available.
pub fn is_available(asset: &Asset) -> bool {
    match asset.status {
        AssetStatus::PendingDisposal => false,
        AssetStatus::InStorage | AssetStatus::PendingAssignment => true,
        AssetStatus::InMaintenance => false,
        AssetStatus::InUse => !asset.has_assignee(),
    }
}

pub fn available_assets(snapshot: &LedgerSnapshot) -> Vec<&Asset> {
    snapshot.assets.iter().filter(|a| is_available(a)).collect()
}

fn scheduled_on(record: &MaintenanceRecord) -> Option<NaiveDate> {
    parse_record_date(&record.scheduled_date)
}

/// Open records scheduled strictly before `now`. Unparseable dates are skipped.
pub fn overdue_maintenance_records(
    snapshot: &LedgerSnapshot,
    now: NaiveDate,
) -> Vec<&MaintenanceRecord> {
    snapshot
        .maintenance_records
        .iter()
        .filter(|r| !r.status.is_closed())
        .filter(|r| scheduled_on(r).is_some_and(|d| d < now))
        .collect()
}

/// Scheduled records falling in `[now, now + 30 days]`. Unparseable dates are
/// skipped.
pub fn upcoming_maintenance_records(
    snapshot: &LedgerSnapshot,
    now: NaiveDate,
) -> Vec<&MaintenanceRecord> {
    let horizon = now
        .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MAX);
    snapshot
        .maintenance_records
        .iter()
        .filter(|r| r.status == MaintenanceStatus::Scheduled)
        .filter(|r| scheduled_on(r).is_some_and(|d| now <= d && d <= horizon))
        .collect()
}

pub fn maintenance_by_asset<'a>(
    snapshot: &'a LedgerSnapshot,
    asset_id: &RecordId,
) -> Vec<&'a MaintenanceRecord> {
    snapshot
        .maintenance_records
        .iter()
        .filter(|r| &r.asset_id == asset_id)
        .collect()
}

/// Records whose scheduled date cannot be parsed; these never show up as
/// overdue or upcoming.
pub fn unparseable_maintenance_dates(snapshot: &LedgerSnapshot) -> Vec<&MaintenanceRecord> {
    snapshot
        .maintenance_records
        .iter()
        .filter(|r| scheduled_on(r).is_none())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub as_of: NaiveDate,
    pub total_assets: usize,
    pub active_assets: usize,
    pub storage_assets: usize,
    pub maintenance_due_assets: usize,
    pub disposal_pending_assets: usize,
    pub available_assets: usize,
    pub by_status: BTreeMap<AssetStatus, usize>,
    pub by_department: BTreeMap<String, usize>,
    pub upcoming_maintenance: Vec<MaintenanceRecord>,
    pub overdue_maintenance: Vec<MaintenanceRecord>,
}

pub fn dashboard_summary(snapshot: &LedgerSnapshot, now: NaiveDate) -> DashboardSummary {
    DashboardSummary {
        as_of: now,
        total_assets: total_assets(snapshot),
        active_assets: active_assets(snapshot),
        storage_assets: storage_assets(snapshot),
        maintenance_due_assets: maintenance_due_assets(snapshot),
        disposal_pending_assets: disposal_pending_assets(snapshot),
        available_assets: available_assets(snapshot).len(),
        by_status: count_by_status(snapshot),
        by_department: count_by_department(snapshot),
        upcoming_maintenance: upcoming_maintenance_records(snapshot, now)
            .into_iter()
            .cloned()
            .collect(),
        overdue_maintenance: overdue_maintenance_records(snapshot, now)
            .into_iter()
            .cloned()
            .collect(),
    }
}
