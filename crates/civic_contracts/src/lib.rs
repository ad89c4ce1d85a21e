#![forbid(unsafe_code)]

pub mod asset;
pub mod assignment;
pub mod common;
pub mod directory;
pub mod maintenance;
pub mod navigation;
pub mod transfer;

pub use common::{ContractViolation, RecordId, SchemaVersion, Validate};
