#![forbid(unsafe_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use civic_contracts::asset::{to_display_status, Asset};
use civic_contracts::RecordId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::snapshot::{
    DirectorySnapshot, LedgerSnapshot, DIRECTORY_SNAPSHOT_VERSION, LEDGER_SNAPSHOT_VERSION,
};
use crate::StorageError;

/// Result of a load. An unreadable document or an undecodable collection
/// still yields a usable snapshot, but `degraded` is set so callers holding
/// live state can refuse to adopt it.
#[derive(Debug, Clone, Default)]
pub struct Loaded<T> {
    pub snapshot: T,
    pub degraded: bool,
}

impl<T> Loaded<T> {
    pub fn clean(snapshot: T) -> Self {
        Self {
            snapshot,
            degraded: false,
        }
    }

    pub fn into_snapshot(self) -> T {
        self.snapshot
    }
}

/// Whole-snapshot persistence for the four ledger collections.
///
/// `load_snapshot` never fails: a missing or undecodable collection is
/// returned empty and the load is flagged degraded. `save_snapshot` writes
/// all four collections in one call.
pub trait LedgerPersistence: Send {
    fn load_snapshot(&self) -> Loaded<LedgerSnapshot>;
    fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError>;
}

/// Whole-snapshot persistence for users, departments and account requests.
pub trait DirectoryPersistence: Send {
    fn load_directory(&self) -> Loaded<DirectorySnapshot>;
    fn save_directory(&self, snapshot: &DirectorySnapshot) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    File,
    Memory,
}

impl PersistenceMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" | "json" | "durable" => Some(Self::File),
            "memory" | "mock" | "in_memory" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PersistenceMode::File => "file",
            PersistenceMode::Memory => "memory",
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    ledger: Option<LedgerSnapshot>,
    directory: Option<DirectorySnapshot>,
    ledger_saves: u64,
    directory_saves: u64,
}

/// Non-durable persistence. Clones share state, so a test can keep a handle
/// while a store owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    state: Arc<Mutex<InMemoryState>>,
    fail_saves: Arc<AtomicBool>,
}

impl InMemoryPersistence {
    pub fn seeded(ledger: LedgerSnapshot, directory: DirectorySnapshot) -> Self {
        let out = Self::default();
        {
            let mut state = out.lock_state();
            state.ledger = Some(ledger);
            state.directory = Some(directory);
        }
        out
    }

    /// While set, every save fails with `StorageError::Persistence`.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn ledger_save_count(&self) -> u64 {
        self.lock_state().ledger_saves
    }

    pub fn directory_save_count(&self) -> u64 {
        self.lock_state().directory_saves
    }

    /// Replaces the stored directory as an outside writer would.
    pub fn overwrite_directory(&self, directory: DirectorySnapshot) {
        self.lock_state().directory = Some(directory);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_fail(&self) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Persistence {
                reason: "in-memory persistence configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

impl LedgerPersistence for InMemoryPersistence {
    fn load_snapshot(&self) -> Loaded<LedgerSnapshot> {
        Loaded::clean(self.lock_state().ledger.clone().unwrap_or_default())
    }

    fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        self.check_fail()?;
        let mut state = self.lock_state();
        state.ledger = Some(snapshot.clone());
        state.ledger_saves += 1;
        Ok(())
    }
}

impl DirectoryPersistence for InMemoryPersistence {
    fn load_directory(&self) -> Loaded<DirectorySnapshot> {
        Loaded::clean(self.lock_state().directory.clone().unwrap_or_default())
    }

    fn save_directory(&self, snapshot: &DirectorySnapshot) -> Result<(), StorageError> {
        self.check_fail()?;
        let mut state = self.lock_state();
        state.directory = Some(snapshot.clone());
        state.directory_saves += 1;
        Ok(())
    }
}

pub const LEDGER_FILE_NAME: &str = "ledger.json";
pub const DIRECTORY_FILE_NAME: &str = "directory.json";

/// Durable persistence: one JSON document per snapshot, replaced atomically
/// through a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    ledger_path: PathBuf,
    directory_path: PathBuf,
}

impl JsonFilePersistence {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|err| StorageError::Persistence {
            reason: format!(
                "failed to create data directory '{}': {}",
                data_dir.display(),
                err
            ),
        })?;
        Ok(Self {
            ledger_path: data_dir.join(LEDGER_FILE_NAME),
            directory_path: data_dir.join(DIRECTORY_FILE_NAME),
        })
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory_path
    }
}

/// On-disk asset row; status is kept in the persisted vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAsset {
    id: RecordId,
    name: String,
    category: String,
    status: String,
    department: String,
    #[serde(default)]
    assigned_to: Option<String>,
    purchase_date: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    location: String,
}

impl From<&Asset> for StoredAsset {
    fn from(a: &Asset) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            category: a.category.clone(),
            status: a.status.persisted_label().to_string(),
            department: a.department.clone(),
            assigned_to: a.assigned_to.clone(),
            purchase_date: a.purchase_date.clone(),
            notes: a.notes.clone(),
            location: a.location.clone(),
        }
    }
}

impl From<StoredAsset> for Asset {
    fn from(s: StoredAsset) -> Self {
        Self {
            id: s.id,
            name: s.name,
            category: s.category,
            status: to_display_status(&s.status),
            department: s.department,
            assigned_to: s.assigned_to,
            purchase_date: s.purchase_date,
            notes: s.notes,
            location: s.location,
        }
    }
}

enum Document {
    Absent,
    Unusable,
    Present(Value),
}

fn read_document(path: &Path, expected_version: u32) -> Document {
    if !path.exists() {
        debug!(path = %path.display(), "snapshot file absent; starting empty");
        return Document::Absent;
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed reading snapshot file; treating as empty");
            return Document::Unusable;
        }
    };
    let root: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "snapshot file is not valid JSON; treating as empty");
            return Document::Unusable;
        }
    };
    let version = root.get("schemaVersion").and_then(Value::as_u64);
    if version != Some(u64::from(expected_version)) {
        warn!(
            path = %path.display(),
            found = ?version,
            expected = expected_version,
            "unsupported snapshot schemaVersion; treating as empty"
        );
        return Document::Unusable;
    }
    Document::Present(root)
}

/// Decodes one collection; any failure drops just that collection and marks
/// the load degraded.
fn decode_collection<T: DeserializeOwned>(
    root: &Value,
    key: &'static str,
    degraded: &mut bool,
) -> Vec<T> {
    let Some(raw) = root.get(key) else {
        return Vec::new();
    };
    match serde_json::from_value::<Vec<T>>(raw.clone()) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(collection = key, error = %err, "undecodable snapshot collection; treating as absent");
            *degraded = true;
            Vec::new()
        }
    }
}

fn write_document(path: &Path, document: &Value) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(document).map_err(|err| StorageError::Persistence {
        reason: format!("failed to encode snapshot: {err}"),
    })?;
    let tmp_path = path.with_extension("json.tmp");
    let write_tmp = || -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };
    write_tmp().map_err(|err| {
        error!(path = %path.display(), error = %err, "snapshot write failed");
        StorageError::Persistence {
            reason: format!("failed writing snapshot '{}': {}", path.display(), err),
        }
    })
}

fn encode<T: Serialize>(rows: &[T]) -> Result<Value, StorageError> {
    serde_json::to_value(rows).map_err(|err| StorageError::Persistence {
        reason: format!("failed to encode snapshot collection: {err}"),
    })
}

impl LedgerPersistence for JsonFilePersistence {
    fn load_snapshot(&self) -> Loaded<LedgerSnapshot> {
        let root = match read_document(&self.ledger_path, LEDGER_SNAPSHOT_VERSION.0) {
            Document::Present(root) => root,
            Document::Absent => return Loaded::clean(LedgerSnapshot::default()),
            Document::Unusable => {
                return Loaded {
                    snapshot: LedgerSnapshot::default(),
                    degraded: true,
                }
            }
        };
        let mut degraded = false;
        let snapshot = LedgerSnapshot {
            assets: decode_collection::<StoredAsset>(&root, "assets", &mut degraded)
                .into_iter()
                .map(Asset::from)
                .collect(),
            assignments: decode_collection(&root, "assignments", &mut degraded),
            transfers: decode_collection(&root, "transfers", &mut degraded),
            maintenance_records: decode_collection(&root, "maintenanceRecords", &mut degraded),
        };
        Loaded { snapshot, degraded }
    }

    fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
        let assets: Vec<StoredAsset> = snapshot.assets.iter().map(StoredAsset::from).collect();
        let document = serde_json::json!({
            "schemaVersion": LEDGER_SNAPSHOT_VERSION.0,
            "assets": encode(&assets)?,
            "assignments": encode(&snapshot.assignments)?,
            "transfers": encode(&snapshot.transfers)?,
            "maintenanceRecords": encode(&snapshot.maintenance_records)?,
        });
        write_document(&self.ledger_path, &document)
    }
}

impl DirectoryPersistence for JsonFilePersistence {
    fn load_directory(&self) -> Loaded<DirectorySnapshot> {
        let root = match read_document(&self.directory_path, DIRECTORY_SNAPSHOT_VERSION.0) {
            Document::Present(root) => root,
            Document::Absent => return Loaded::clean(DirectorySnapshot::default()),
            Document::Unusable => {
                return Loaded {
                    snapshot: DirectorySnapshot::default(),
                    degraded: true,
                }
            }
        };
        let mut degraded = false;
        let snapshot = DirectorySnapshot {
            users: decode_collection(&root, "users", &mut degraded),
            departments: decode_collection(&root, "departments", &mut degraded),
            account_requests: decode_collection(&root, "accountRequests", &mut degraded),
        };
        Loaded { snapshot, degraded }
    }

    fn save_directory(&self, snapshot: &DirectorySnapshot) -> Result<(), StorageError> {
        let document = serde_json::json!({
            "schemaVersion": DIRECTORY_SNAPSHOT_VERSION.0,
            "users": encode(&snapshot.users)?,
            "departments": encode(&snapshot.departments)?,
            "accountRequests": encode(&snapshot.account_requests)?,
        });
        write_document(&self.directory_path, &document)
    }
}
