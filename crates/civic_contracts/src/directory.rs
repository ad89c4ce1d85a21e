#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{
    validate_email, validate_free_text, validate_opt_text, validate_text, NOTES_MAX_LEN,
    TEXT_MAX_LEN,
};
use crate::{ContractViolation, Validate};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    #[serde(default)]
    pub job_title: String,
    pub role: UserRole,
    pub active: bool,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as returned to callers; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub job_title: String,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            department: u.department.clone(),
            job_title: u.job_title.clone(),
            role: u.role,
            active: u.active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

fn validate_password(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    if value.len() < PASSWORD_MIN_LEN {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be at least 8 characters",
        });
    }
    if value.len() > PASSWORD_MAX_LEN {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    #[serde(default)]
    pub job_title: String,
    pub role: UserRole,
    pub password: String,
}

impl Validate for UserInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_email("user.email", &self.email)?;
        validate_text("user.first_name", &self.first_name, TEXT_MAX_LEN)?;
        validate_text("user.last_name", &self.last_name, TEXT_MAX_LEN)?;
        validate_text("user.department", &self.department, TEXT_MAX_LEN)?;
        validate_free_text("user.job_title", &self.job_title, TEXT_MAX_LEN)?;
        validate_password("user.password", &self.password)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Validate for UserPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_text("user_patch.first_name", &self.first_name, TEXT_MAX_LEN)?;
        validate_opt_text("user_patch.last_name", &self.last_name, TEXT_MAX_LEN)?;
        validate_opt_text("user_patch.department", &self.department, TEXT_MAX_LEN)?;
        if let Some(v) = &self.job_title {
            validate_free_text("user_patch.job_title", v, TEXT_MAX_LEN)?;
        }
        if let Some(v) = &self.password {
            validate_password("user_patch.password", v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl Validate for DepartmentInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("department.name", &self.name, TEXT_MAX_LEN)?;
        validate_free_text("department.code", &self.code, 32)?;
        validate_free_text("department.description", &self.description, NOTES_MAX_LEN)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for DepartmentPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_text("department_patch.name", &self.name, TEXT_MAX_LEN)?;
        if let Some(v) = &self.code {
            validate_free_text("department_patch.code", v, 32)?;
        }
        if let Some(v) = &self.description {
            validate_free_text("department_patch.description", v, NOTES_MAX_LEN)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl AccountRequestStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub reason: String,
    pub status: AccountRequestStatus,
    pub request_date: String,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequestInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub reason: String,
}

impl Validate for AccountRequestInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("account_request.first_name", &self.first_name, TEXT_MAX_LEN)?;
        validate_text("account_request.last_name", &self.last_name, TEXT_MAX_LEN)?;
        validate_email("account_request.email", &self.email)?;
        validate_text("account_request.department", &self.department, TEXT_MAX_LEN)?;
        validate_free_text("account_request.job_title", &self.job_title, TEXT_MAX_LEN)?;
        validate_free_text("account_request.reason", &self.reason, NOTES_MAX_LEN)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReview {
    pub reviewed_by: String,
    #[serde(default)]
    pub review_notes: Option<String>,
}

impl Validate for AccountReview {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("account_review.reviewed_by", &self.reviewed_by, TEXT_MAX_LEN)?;
        if let Some(v) = &self.review_notes {
            validate_free_text("account_review.review_notes", v, NOTES_MAX_LEN)?;
        }
        Ok(())
    }
}
