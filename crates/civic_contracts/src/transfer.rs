#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{
    validate_date, validate_free_text, validate_opt_date, validate_opt_text, validate_text,
    NOTES_MAX_LEN, TEXT_MAX_LEN,
};
use crate::{ContractViolation, RecordId, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: RecordId,
    pub asset_id: RecordId,
    pub asset_name: String,
    pub from_user: String,
    pub to_user: String,
    pub from_department: String,
    pub to_department: String,
    pub transfer_date: String,
    #[serde(default)]
    pub approved_by: String,
    pub status: TransferStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    pub asset_id: RecordId,
    /// Overwritten from the referenced asset when it exists.
    #[serde(default)]
    pub asset_name: String,
    pub from_user: String,
    pub to_user: String,
    pub from_department: String,
    pub to_department: String,
    pub transfer_date: String,
    #[serde(default)]
    pub approved_by: String,
    pub status: TransferStatus,
    #[serde(default)]
    pub notes: String,
}

impl Validate for TransferInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.asset_id.validate()?;
        validate_free_text("transfer.asset_name", &self.asset_name, TEXT_MAX_LEN)?;
        validate_free_text("transfer.from_user", &self.from_user, TEXT_MAX_LEN)?;
        validate_text("transfer.to_user", &self.to_user, TEXT_MAX_LEN)?;
        validate_text("transfer.from_department", &self.from_department, TEXT_MAX_LEN)?;
        validate_text("transfer.to_department", &self.to_department, TEXT_MAX_LEN)?;
        validate_date("transfer.transfer_date", &self.transfer_date)?;
        validate_free_text("transfer.approved_by", &self.approved_by, TEXT_MAX_LEN)?;
        validate_free_text("transfer.notes", &self.notes, NOTES_MAX_LEN)?;
        Ok(())
    }
}

impl Transfer {
    pub fn from_input(id: RecordId, input: TransferInput) -> Result<Self, ContractViolation> {
        input.validate()?;
        Ok(Self {
            id,
            asset_id: input.asset_id,
            asset_name: input.asset_name,
            from_user: input.from_user,
            to_user: input.to_user,
            from_department: input.from_department,
            to_department: input.to_department,
            transfer_date: input.transfer_date,
            approved_by: input.approved_by,
            status: input.status,
            notes: input.notes,
        })
    }

    pub fn apply_patch(&mut self, patch: TransferPatch) {
        if let Some(v) = patch.to_user {
            self.to_user = v;
        }
        if let Some(v) = patch.to_department {
            self.to_department = v;
        }
        if let Some(v) = patch.transfer_date {
            self.transfer_date = v;
        }
        if let Some(v) = patch.approved_by {
            self.approved_by = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPatch {
    #[serde(default)]
    pub to_user: Option<String>,
    #[serde(default)]
    pub to_department: Option<String>,
    #[serde(default)]
    pub transfer_date: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub status: Option<TransferStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for TransferPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_text("transfer_patch.to_user", &self.to_user, TEXT_MAX_LEN)?;
        validate_opt_text("transfer_patch.to_department", &self.to_department, TEXT_MAX_LEN)?;
        validate_opt_date("transfer_patch.transfer_date", &self.transfer_date)?;
        if let Some(v) = &self.approved_by {
            validate_free_text("transfer_patch.approved_by", v, TEXT_MAX_LEN)?;
        }
        if let Some(v) = &self.notes {
            validate_free_text("transfer_patch.notes", v, NOTES_MAX_LEN)?;
        }
        Ok(())
    }
}
