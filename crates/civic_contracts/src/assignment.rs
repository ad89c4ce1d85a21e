#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{
    double_option, validate_date, validate_free_text, validate_opt_date, validate_opt_text,
    validate_text, NOTES_MAX_LEN, TEXT_MAX_LEN,
};
use crate::{ContractViolation, RecordId, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Active,
    Pending,
    #[serde(rename = "In Maintenance", alias = "InMaintenance")]
    InMaintenance,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: RecordId,
    pub asset_id: RecordId,
    pub asset_name: String,
    pub assigned_to: String,
    pub department: String,
    pub assigned_date: String,
    #[serde(default)]
    pub due_date: Option<String>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    pub asset_id: RecordId,
    /// Overwritten from the referenced asset when it exists.
    #[serde(default)]
    pub asset_name: String,
    pub assigned_to: String,
    pub department: String,
    pub assigned_date: String,
    #[serde(default)]
    pub due_date: Option<String>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub notes: String,
}

impl Validate for AssignmentInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.asset_id.validate()?;
        validate_free_text("assignment.asset_name", &self.asset_name, TEXT_MAX_LEN)?;
        validate_text("assignment.assigned_to", &self.assigned_to, TEXT_MAX_LEN)?;
        validate_text("assignment.department", &self.department, TEXT_MAX_LEN)?;
        validate_date("assignment.assigned_date", &self.assigned_date)?;
        validate_opt_date("assignment.due_date", &self.due_date)?;
        validate_free_text("assignment.notes", &self.notes, NOTES_MAX_LEN)?;
        Ok(())
    }
}

impl Assignment {
    pub fn from_input(id: RecordId, input: AssignmentInput) -> Result<Self, ContractViolation> {
        input.validate()?;
        Ok(Self {
            id,
            asset_id: input.asset_id,
            asset_name: input.asset_name,
            assigned_to: input.assigned_to,
            department: input.department,
            assigned_date: input.assigned_date,
            due_date: input.due_date,
            status: input.status,
            notes: input.notes,
        })
    }

    pub fn apply_patch(&mut self, patch: AssignmentPatch) {
        if let Some(v) = patch.assigned_to {
            self.assigned_to = v;
        }
        if let Some(v) = patch.department {
            self.department = v;
        }
        if let Some(v) = patch.assigned_date {
            self.assigned_date = v;
        }
        if let Some(v) = patch.due_date {
            self.due_date = v;
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
pub struct AssignmentPatch {
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub assigned_date: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<AssignmentStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for AssignmentPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_text("assignment_patch.assigned_to", &self.assigned_to, TEXT_MAX_LEN)?;
        validate_opt_text("assignment_patch.department", &self.department, TEXT_MAX_LEN)?;
        validate_opt_date("assignment_patch.assigned_date", &self.assigned_date)?;
        if let Some(due_date) = &self.due_date {
            validate_opt_date("assignment_patch.due_date", due_date)?;
        }
        if let Some(v) = &self.notes {
            validate_free_text("assignment_patch.notes", v, NOTES_MAX_LEN)?;
        }
        Ok(())
    }
}
