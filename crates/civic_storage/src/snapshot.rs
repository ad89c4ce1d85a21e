#![forbid(unsafe_code)]

use civic_contracts::asset::Asset;
use civic_contracts::assignment::Assignment;
use civic_contracts::directory::{AccountRequest, Department, User};
use civic_contracts::maintenance::MaintenanceRecord;
use civic_contracts::transfer::Transfer;
use civic_contracts::{RecordId, SchemaVersion};

pub const LEDGER_SNAPSHOT_VERSION: SchemaVersion = SchemaVersion(1);
pub const DIRECTORY_SNAPSHOT_VERSION: SchemaVersion = SchemaVersion(1);

/// The four ledger collections, always loaded and saved together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub assets: Vec<Asset>,
    pub assignments: Vec<Assignment>,
    pub transfers: Vec<Transfer>,
    pub maintenance_records: Vec<MaintenanceRecord>,
}

impl LedgerSnapshot {
    pub fn record_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.assets
            .iter()
            .map(|r| &r.id)
            .chain(self.assignments.iter().map(|r| &r.id))
            .chain(self.transfers.iter().map(|r| &r.id))
            .chain(self.maintenance_records.iter().map(|r| &r.id))
    }

    pub fn row_count(&self) -> usize {
        self.assets.len()
            + self.assignments.len()
            + self.transfers.len()
            + self.maintenance_records.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub users: Vec<User>,
    pub departments: Vec<Department>,
    pub account_requests: Vec<AccountRequest>,
}
