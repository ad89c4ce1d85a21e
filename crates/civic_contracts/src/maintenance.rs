#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{
    double_option, validate_date, validate_free_text, validate_opt_date, NOTES_MAX_LEN,
    TEXT_MAX_LEN,
};
use crate::{ContractViolation, RecordId, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceType {
    Preventive,
    Corrective,
    Inspection,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceStatus {
    Scheduled,
    #[serde(rename = "In Progress", alias = "InProgress")]
    InProgress,
    Completed,
    Overdue,
    Cancelled,
}

impl MaintenanceStatus {
    /// Closed records never count as overdue.
    pub fn is_closed(self) -> bool {
        matches!(self, MaintenanceStatus::Completed | MaintenanceStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: RecordId,
    pub asset_id: RecordId,
    pub asset_name: String,
    pub maintenance_type: MaintenanceType,
    pub status: MaintenanceStatus,
    pub scheduled_date: String,
    #[serde(default)]
    pub completed_date: Option<String>,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceInput {
    pub asset_id: RecordId,
    /// Overwritten from the referenced asset when it exists.
    #[serde(default)]
    pub asset_name: String,
    pub maintenance_type: MaintenanceType,
    pub status: MaintenanceStatus,
    pub scheduled_date: String,
    #[serde(default)]
    pub completed_date: Option<String>,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
}

impl Validate for MaintenanceInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.asset_id.validate()?;
        validate_free_text("maintenance.asset_name", &self.asset_name, TEXT_MAX_LEN)?;
        validate_date("maintenance.scheduled_date", &self.scheduled_date)?;
        validate_opt_date("maintenance.completed_date", &self.completed_date)?;
        validate_free_text("maintenance.assigned_to", &self.assigned_to, TEXT_MAX_LEN)?;
        validate_free_text("maintenance.description", &self.description, NOTES_MAX_LEN)?;
        validate_free_text("maintenance.notes", &self.notes, NOTES_MAX_LEN)?;
        Ok(())
    }
}

impl MaintenanceRecord {
    pub fn from_input(id: RecordId, input: MaintenanceInput) -> Result<Self, ContractViolation> {
        input.validate()?;
        Ok(Self {
            id,
            asset_id: input.asset_id,
            asset_name: input.asset_name,
            maintenance_type: input.maintenance_type,
            status: input.status,
            scheduled_date: input.scheduled_date,
            completed_date: input.completed_date,
            assigned_to: input.assigned_to,
            description: input.description,
            notes: input.notes,
        })
    }

    pub fn apply_patch(&mut self, patch: MaintenancePatch) {
        if let Some(v) = patch.maintenance_type {
            self.maintenance_type = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.scheduled_date {
            self.scheduled_date = v;
        }
        if let Some(v) = patch.completed_date {
            self.completed_date = v;
        }
        if let Some(v) = patch.assigned_to {
            self.assigned_to = v;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePatch {
    #[serde(default)]
    pub maintenance_type: Option<MaintenanceType>,
    #[serde(default)]
    pub status: Option<MaintenanceStatus>,
    #[serde(default)]
    pub scheduled_date: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub completed_date: Option<Option<String>>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for MaintenancePatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_date("maintenance_patch.scheduled_date", &self.scheduled_date)?;
        if let Some(completed_date) = &self.completed_date {
            validate_opt_date("maintenance_patch.completed_date", completed_date)?;
        }
        if let Some(v) = &self.assigned_to {
            validate_free_text("maintenance_patch.assigned_to", v, TEXT_MAX_LEN)?;
        }
        if let Some(v) = &self.description {
            validate_free_text("maintenance_patch.description", v, NOTES_MAX_LEN)?;
        }
        if let Some(v) = &self.notes {
            validate_free_text("maintenance_patch.notes", v, NOTES_MAX_LEN)?;
        }
        Ok(())
    }
}
