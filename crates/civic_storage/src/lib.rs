#![forbid(unsafe_code)]

pub mod directory;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod persistence;
pub mod snapshot;
pub mod views;

pub use error::StorageError;
