#![forbid(unsafe_code)]

use chrono::Utc;
use civic_contracts::asset::{Asset, AssetInput, AssetPatch, AssetStatus};
use civic_contracts::assignment::{
    Assignment, AssignmentInput, AssignmentPatch, AssignmentStatus,
};
use civic_contracts::maintenance::{MaintenanceInput, MaintenancePatch, MaintenanceRecord};
use civic_contracts::transfer::{Transfer, TransferInput, TransferPatch};
use civic_contracts::{RecordId, Validate};
use tracing::{debug, error, info, warn};

use crate::ids::IdAllocator;
use crate::persistence::{InMemoryPersistence, LedgerPersistence};
use crate::snapshot::LedgerSnapshot;
use crate::StorageError;

const ASSETS: &str = "assets";
const ASSIGNMENTS: &str = "assignments";
const TRANSFERS: &str = "transfers";
const MAINTENANCE_RECORDS: &str = "maintenance_records";

trait LedgerRow {
    fn row_id(&self) -> &RecordId;
}

impl LedgerRow for Asset {
    fn row_id(&self) -> &RecordId {
        &self.id
    }
}

impl LedgerRow for Assignment {
    fn row_id(&self) -> &RecordId {
        &self.id
    }
}

impl LedgerRow for Transfer {
    fn row_id(&self) -> &RecordId {
        &self.id
    }
}

impl LedgerRow for MaintenanceRecord {
    fn row_id(&self) -> &RecordId {
        &self.id
    }
}

fn find<'a, T: LedgerRow>(rows: &'a [T], id: &RecordId) -> Option<&'a T> {
    rows.iter().find(|r| r.row_id() == id)
}

fn position<T: LedgerRow>(
    rows: &[T],
    table: &'static str,
    id: &RecordId,
) -> Result<usize, StorageError> {
    rows.iter()
        .position(|r| r.row_id() == id)
        .ok_or_else(|| StorageError::not_found(table, id))
}

/// In-memory owner of the four ledger collections.
///
/// Every mutation is staged on a copy of the snapshot, written through the
/// persistence adapter in a single call and only then committed, so a failed
/// save leaves the visible state untouched.
pub struct LedgerStore {
    state: LedgerSnapshot,
    ids: IdAllocator,
    persistence: Box<dyn LedgerPersistence>,
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore")
            .field("rows", &self.state.row_count())
            .field("next_id", &self.ids.peek())
            .finish()
    }
}

impl LedgerStore {
    /// Starts from whatever the adapter yields; a degraded load still opens.
    pub fn open(persistence: Box<dyn LedgerPersistence>) -> Self {
        let loaded = persistence.load_snapshot();
        if loaded.degraded {
            warn!("ledger snapshot load was degraded; opening with the recoverable rows");
        }
        let state = loaded.into_snapshot();
        let mut ids = IdAllocator::default();
        ids.initialize_from(&state);
        info!(
            assets = state.assets.len(),
            assignments = state.assignments.len(),
            transfers = state.transfers.len(),
            maintenance_records = state.maintenance_records.len(),
            next_id = ids.peek(),
            "ledger snapshot loaded"
        );
        Self {
            state,
            ids,
            persistence,
        }
    }

    pub fn new_in_memory() -> Self {
        Self::open(Box::new(InMemoryPersistence::default()))
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.state
    }

    /// Value the allocator will issue next.
    pub fn next_id_value(&self) -> u64 {
        self.ids.peek()
    }

    /// Replaces in-memory state with the persisted snapshot. The allocator is
    /// re-initialized from it but never moves backwards. A degraded load is
    /// not adopted; returns whether the state was replaced.
    pub fn reload(&mut self) -> bool {
        let loaded = self.persistence.load_snapshot();
        if loaded.degraded {
            warn!(
                rows = self.state.row_count(),
                "ledger snapshot load was degraded; keeping in-memory state"
            );
            return false;
        }
        let state = loaded.into_snapshot();
        let previous_next = self.ids.peek();
        self.ids.initialize_from(&state);
        self.ids.ensure_at_least(previous_next);
        self.state = state;
        true
    }

    fn commit(&mut self, staged: LedgerSnapshot) -> Result<(), StorageError> {
        if let Err(err) = self.persistence.save_snapshot(&staged) {
            error!(error = %err, "ledger snapshot save failed; staged change discarded");
            return Err(err);
        }
        self.state = staged;
        Ok(())
    }

    // Assets

    pub fn asset(&self, id: &RecordId) -> Option<&Asset> {
        find(&self.state.assets, id)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.state.assets
    }

    pub fn create_asset(&mut self, input: AssetInput) -> Result<Asset, StorageError> {
        input.validate()?;
        let asset = Asset::from_input(self.ids.next_id(), input)?;
        let mut staged = self.state.clone();
        staged.assets.push(asset.clone());
        ensure_active_assignment(&mut staged, &asset, &mut self.ids);
        self.commit(staged)?;
        debug!(asset_id = %asset.id, "asset created");
        Ok(asset)
    }

    /// Merges `patch` into the asset and re-syncs the denormalized copies held
    /// by its assignments and maintenance records, all in one save.
    pub fn update_asset(&mut self, id: &RecordId, patch: AssetPatch) -> Result<Asset, StorageError> {
        patch.validate()?;
        let idx = position(&self.state.assets, ASSETS, id)?;
        let mut staged = self.state.clone();
        staged.assets[idx].apply_patch(patch);
        let updated = staged.assets[idx].clone();
        sync_denormalized_fields(&mut staged, &updated);
        ensure_active_assignment(&mut staged, &updated, &mut self.ids);
        self.commit(staged)?;
        Ok(updated)
    }

    /// Removes the asset and every assignment, transfer and maintenance row
    /// pointing at it. Returns `false` if no such asset exists.
    pub fn delete_asset(&mut self, id: &RecordId) -> Result<bool, StorageError> {
        if self.asset(id).is_none() {
            return Ok(false);
        }
        let mut staged = self.state.clone();
        staged.assignments.retain(|r| &r.asset_id != id);
        staged.transfers.retain(|r| &r.asset_id != id);
        staged.maintenance_records.retain(|r| &r.asset_id != id);
        staged.assets.retain(|r| &r.id != id);
        self.commit(staged)?;
        debug!(asset_id = %id, "asset deleted with dependents");
        Ok(true)
    }

    // Assignments

    pub fn assignment(&self, id: &RecordId) -> Option<&Assignment> {
        find(&self.state.assignments, id)
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.state.assignments
    }

    pub fn create_assignment(&mut self, input: AssignmentInput) -> Result<Assignment, StorageError> {
        input.validate()?;
        let mut row = Assignment::from_input(self.ids.next_id(), input)?;
        if let Some(asset) = self.asset(&row.asset_id) {
            row.asset_name = asset.name.clone();
        }
        let mut staged = self.state.clone();
        staged.assignments.push(row.clone());
        self.commit(staged)?;
        Ok(row)
    }

    pub fn update_assignment(
        &mut self,
        id: &RecordId,
        patch: AssignmentPatch,
    ) -> Result<Assignment, StorageError> {
        patch.validate()?;
        let idx = position(&self.state.assignments, ASSIGNMENTS, id)?;
        let mut staged = self.state.clone();
        staged.assignments[idx].apply_patch(patch);
        let updated = staged.assignments[idx].clone();
        self.commit(staged)?;
        Ok(updated)
    }

    pub fn delete_assignment(&mut self, id: &RecordId) -> Result<bool, StorageError> {
        if self.assignment(id).is_none() {
            return Ok(false);
        }
        let mut staged = self.state.clone();
        staged.assignments.retain(|r| &r.id != id);
        self.commit(staged)?;
        Ok(true)
    }

    // Transfers

    pub fn transfer(&self, id: &RecordId) -> Option<&Transfer> {
        find(&self.state.transfers, id)
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.state.transfers
    }

    pub fn create_transfer(&mut self, input: TransferInput) -> Result<Transfer, StorageError> {
        input.validate()?;
        let mut row = Transfer::from_input(self.ids.next_id(), input)?;
        if let Some(asset) = self.asset(&row.asset_id) {
            row.asset_name = asset.name.clone();
        }
        let mut staged = self.state.clone();
        staged.transfers.push(row.clone());
        self.commit(staged)?;
        Ok(row)
    }

    pub fn update_transfer(
        &mut self,
        id: &RecordId,
        patch: TransferPatch,
    ) -> Result<Transfer, StorageError> {
        patch.validate()?;
        let idx = position(&self.state.transfers, TRANSFERS, id)?;
        let mut staged = self.state.clone();
        staged.transfers[idx].apply_patch(patch);
        let updated = staged.transfers[idx].clone();
        self.commit(staged)?;
        Ok(updated)
    }

    pub fn delete_transfer(&mut self, id: &RecordId) -> Result<bool, StorageError> {
        if self.transfer(id).is_none() {
            return Ok(false);
        }
        let mut staged = self.state.clone();
        staged.transfers.retain(|r| &r.id != id);
        self.commit(staged)?;
        Ok(true)
    }

    // Maintenance records

    pub fn maintenance_record(&self, id: &RecordId) -> Option<&MaintenanceRecord> {
        find(&self.state.maintenance_records, id)
    }

    pub fn maintenance_records(&self) -> &[MaintenanceRecord] {
        &self.state.maintenance_records
    }

    pub fn create_maintenance_record(
        &mut self,
        input: MaintenanceInput,
    ) -> Result<MaintenanceRecord, StorageError> {
        input.validate()?;
        let mut row = MaintenanceRecord::from_input(self.ids.next_id(), input)?;
        if let Some(asset) = self.asset(&row.asset_id) {
            row.asset_name = asset.name.clone();
        }
        let mut staged = self.state.clone();
        staged.maintenance_records.push(row.clone());
        self.commit(staged)?;
        Ok(row)
    }

    pub fn update_maintenance_record(
        &mut self,
        id: &RecordId,
        patch: MaintenancePatch,
    ) -> Result<MaintenanceRecord, StorageError> {
        patch.validate()?;
        let idx = position(&self.state.maintenance_records, MAINTENANCE_RECORDS, id)?;
        let mut staged = self.state.clone();
        staged.maintenance_records[idx].apply_patch(patch);
        let updated = staged.maintenance_records[idx].clone();
        self.commit(staged)?;
        Ok(updated)
    }

    pub fn delete_maintenance_record(&mut self, id: &RecordId) -> Result<bool, StorageError> {
        if self.maintenance_record(id).is_none() {
            return Ok(false);
        }
        let mut staged = self.state.clone();
        staged.maintenance_records.retain(|r| &r.id != id);
        self.commit(staged)?;
        Ok(true)
    }
}

fn sync_denormalized_fields(staged: &mut LedgerSnapshot, asset: &Asset) {
    let assignee = asset
        .assigned_to
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    for row in staged
        .assignments
        .iter_mut()
        .filter(|r| r.asset_id == asset.id)
    {
        row.asset_name = asset.name.clone();
        row.department = asset.department.clone();
        if let Some(who) = assignee {
            row.assigned_to = who.to_string();
        }
    }
    for row in staged
        .maintenance_records
        .iter_mut()
        .filter(|r| r.asset_id == asset.id)
    {
        row.asset_name = asset.name.clone();
    }
}

/// An in-use asset with an assignee gets an Active assignment if it has none
/// for that person.
fn ensure_active_assignment(staged: &mut LedgerSnapshot, asset: &Asset, ids: &mut IdAllocator) {
    if asset.status != AssetStatus::InUse {
        return;
    }
    let Some(who) = asset
        .assigned_to
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return;
    };
    let already_active = staged.assignments.iter().any(|r| {
        r.asset_id == asset.id && r.status == AssignmentStatus::Active && r.assigned_to == who
    });
    if already_active {
        return;
    }
    staged.assignments.push(Assignment {
        id: ids.next_id(),
        asset_id: asset.id.clone(),
        asset_name: asset.name.clone(),
        assigned_to: who.to_string(),
        department: asset.department.clone(),
        assigned_date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        due_date: None,
        status: AssignmentStatus::Active,
        notes: String::new(),
    });
}
