#![forbid(unsafe_code)]

use civic_contracts::ContractViolation;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("{table}: no row with key '{key}'")]
    NotFound { table: &'static str, key: String },
    #[error("{table}: conflict on '{key}': {reason}")]
    Conflict {
        table: &'static str,
        key: String,
        reason: &'static str,
    },
    #[error("invalid credentials")]
    Unauthorized,
    #[error("snapshot persistence failed: {reason}")]
    Persistence { reason: String },
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
}

impl StorageError {
    pub(crate) fn not_found(table: &'static str, key: impl ToString) -> Self {
        StorageError::NotFound {
            table,
            key: key.to_string(),
        }
    }
}
