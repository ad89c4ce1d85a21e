#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{
    double_option, validate_date, validate_free_text, validate_opt_text, validate_text,
    NOTES_MAX_LEN, TEXT_MAX_LEN,
};
use crate::{ContractViolation, RecordId, Validate};

/// Asset status in the display vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetStatus {
    #[serde(rename = "In Use", alias = "InUse")]
    InUse,
    #[serde(rename = "In Storage", alias = "InStorage")]
    InStorage,
    #[serde(rename = "In Maintenance", alias = "InMaintenance")]
    InMaintenance,
    #[serde(rename = "Pending Disposal", alias = "PendingDisposal")]
    PendingDisposal,
    #[serde(rename = "Pending Assignment", alias = "PendingAssignment")]
    PendingAssignment,
}

/// Persisted status used when a stored value is not recognized.
pub const DEFAULT_PERSISTED_STATUS: &str = "inactive";

impl AssetStatus {
    pub const ALL: [AssetStatus; 5] = [
        AssetStatus::InUse,
        AssetStatus::InStorage,
        AssetStatus::InMaintenance,
        AssetStatus::PendingDisposal,
        AssetStatus::PendingAssignment,
    ];

    /// The four statuses the dashboard buckets assets into.
    pub const COUNTED: [AssetStatus; 4] = [
        AssetStatus::InUse,
        AssetStatus::InStorage,
        AssetStatus::InMaintenance,
        AssetStatus::PendingDisposal,
    ];

    pub fn display_label(self) -> &'static str {
        match self {
            AssetStatus::InUse => "In Use",
            AssetStatus::InStorage => "In Storage",
            AssetStatus::InMaintenance => "In Maintenance",
            AssetStatus::PendingDisposal => "Pending Disposal",
            AssetStatus::PendingAssignment => "Pending Assignment",
        }
    }

    pub fn persisted_label(self) -> &'static str {
        match self {
            AssetStatus::InUse => "active",
            AssetStatus::InStorage => DEFAULT_PERSISTED_STATUS,
            AssetStatus::InMaintenance => "maintenance",
            AssetStatus::PendingDisposal => "disposal_pending",
            AssetStatus::PendingAssignment => "pending_assignment",
        }
    }

    /// Accepts display labels with or without spaces, case-insensitive.
    pub fn from_display_label(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| {
            s.display_label()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .eq_ignore_ascii_case(&key)
        })
    }

    pub fn from_persisted_label(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.persisted_label() == key)
    }
}

/// Maps a persisted status to its display status. Unknown values fall back to
/// `InStorage`.
pub fn to_display_status(persisted: &str) -> AssetStatus {
    AssetStatus::from_persisted_label(persisted).unwrap_or(AssetStatus::InStorage)
}

/// Maps a display status label to its persisted form. Unknown values fall back
/// to `inactive`.
pub fn to_persisted_status(display: &str) -> &'static str {
    AssetStatus::from_display_label(display)
        .map(AssetStatus::persisted_label)
        .unwrap_or(DEFAULT_PERSISTED_STATUS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: RecordId,
    pub name: String,
    pub category: String,
    pub status: AssetStatus,
    pub department: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub purchase_date: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInput {
    pub name: String,
    pub category: String,
    pub status: AssetStatus,
    pub department: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub purchase_date: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub location: String,
}

impl Validate for AssetInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("asset.name", &self.name, TEXT_MAX_LEN)?;
        validate_text("asset.category", &self.category, TEXT_MAX_LEN)?;
        validate_text("asset.department", &self.department, TEXT_MAX_LEN)?;
        validate_opt_text("asset.assigned_to", &self.assigned_to, TEXT_MAX_LEN)?;
        validate_date("asset.purchase_date", &self.purchase_date)?;
        validate_free_text("asset.notes", &self.notes, NOTES_MAX_LEN)?;
        validate_free_text("asset.location", &self.location, TEXT_MAX_LEN)?;
        Ok(())
    }
}

impl Asset {
    pub fn from_input(id: RecordId, input: AssetInput) -> Result<Self, ContractViolation> {
        input.validate()?;
        Ok(Self {
            id,
            name: input.name,
            category: input.category,
            status: input.status,
            department: input.department,
            assigned_to: input.assigned_to,
            purchase_date: input.purchase_date,
            notes: input.notes,
            location: input.location,
        })
    }

    pub fn apply_patch(&mut self, patch: AssetPatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.category {
            self.category = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.department {
            self.department = v;
        }
        if let Some(v) = patch.assigned_to {
            self.assigned_to = v;
        }
        if let Some(v) = patch.purchase_date {
            self.purchase_date = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.location {
            self.location = v;
        }
    }

    pub fn has_assignee(&self) -> bool {
        self.assigned_to
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }
}

/// Partial asset update. `assigned_to: Some(None)` clears the assignee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<AssetStatus>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Validate for AssetPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_text("asset_patch.name", &self.name, TEXT_MAX_LEN)?;
        validate_opt_text("asset_patch.category", &self.category, TEXT_MAX_LEN)?;
        validate_opt_text("asset_patch.department", &self.department, TEXT_MAX_LEN)?;
        if let Some(assigned_to) = &self.assigned_to {
            validate_opt_text("asset_patch.assigned_to", assigned_to, TEXT_MAX_LEN)?;
        }
        if let Some(v) = &self.purchase_date {
            validate_date("asset_patch.purchase_date", v)?;
        }
        if let Some(v) = &self.notes {
            validate_free_text("asset_patch.notes", v, NOTES_MAX_LEN)?;
        }
        if let Some(v) = &self.location {
            validate_free_text("asset_patch.location", v, TEXT_MAX_LEN)?;
        }
        Ok(())
    }
}
