#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use civic_contracts::common::normalize_email;
use civic_contracts::directory::{
    AccountRequest, AccountRequestInput, AccountRequestStatus, AccountReview, Department,
    DepartmentInput, DepartmentPatch, User, UserInput, UserPatch, UserRole,
};
use civic_contracts::Validate;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::persistence::{DirectoryPersistence, InMemoryPersistence};
use crate::snapshot::DirectorySnapshot;
use crate::StorageError;

const USERS: &str = "users";
const DEPARTMENTS: &str = "departments";
const ACCOUNT_REQUESTS: &str = "account_requests";

/// Hex SHA-256 of `user_id:password`. The user id acts as the salt.
///
/// This is a single fast hash and `authenticate` compares digests with plain
/// string equality, which is not constant-time. Good enough for the simple
/// directory login here; not a substitute for a password KDF such as argon2
/// on an internet-facing deployment.
pub fn hash_password(user_id: &Uuid, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn temporary_password() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Result of approving an account request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedAccount {
    pub request: AccountRequest,
    pub user: User,
    pub temporary_password: String,
}

/// In-memory owner of users, departments and account requests. Mutations are
/// staged and persisted as one directory snapshot before they become visible.
pub struct DirectoryStore {
    state: DirectorySnapshot,
    persistence: Box<dyn DirectoryPersistence>,
}

impl std::fmt::Debug for DirectoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryStore")
            .field("users", &self.state.users.len())
            .field("departments", &self.state.departments.len())
            .field("account_requests", &self.state.account_requests.len())
            .finish()
    }
}

impl DirectoryStore {
    pub fn open(persistence: Box<dyn DirectoryPersistence>) -> Self {
        let loaded = persistence.load_directory();
        if loaded.degraded {
            warn!("directory snapshot load was degraded; opening with the recoverable rows");
        }
        let state = loaded.into_snapshot();
        info!(
            users = state.users.len(),
            departments = state.departments.len(),
            account_requests = state.account_requests.len(),
            "directory snapshot loaded"
        );
        Self { state, persistence }
    }

    pub fn new_in_memory() -> Self {
        Self::open(Box::new(InMemoryPersistence::default()))
    }

    pub fn snapshot(&self) -> &DirectorySnapshot {
        &self.state
    }

    /// Replaces in-memory state with whatever the adapter currently holds,
    /// unless the load was degraded. Returns whether the state was replaced.
    pub fn reload(&mut self) -> bool {
        let loaded = self.persistence.load_directory();
        if loaded.degraded {
            warn!(
                users = self.state.users.len(),
                account_requests = self.state.account_requests.len(),
                "directory snapshot load was degraded; keeping in-memory state"
            );
            return false;
        }
        self.state = loaded.into_snapshot();
        true
    }

    fn commit(&mut self, staged: DirectorySnapshot) -> Result<(), StorageError> {
        if let Err(err) = self.persistence.save_directory(&staged) {
            error!(error = %err, "directory snapshot save failed; staged change discarded");
            return Err(err);
        }
        self.state = staged;
        Ok(())
    }

    // Account requests

    pub fn account_request(&self, id: &Uuid) -> Option<&AccountRequest> {
        self.state.account_requests.iter().find(|r| &r.id == id)
    }

    pub fn account_requests(&self, status: Option<AccountRequestStatus>) -> Vec<&AccountRequest> {
        self.state
            .account_requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect()
    }

    /// Fails with `Conflict` when a pending request already exists for the
    /// same email.
    pub fn create_account_request(
        &mut self,
        input: AccountRequestInput,
        now: DateTime<Utc>,
    ) -> Result<AccountRequest, StorageError> {
        input.validate()?;
        let email_key = normalize_email(&input.email);
        let duplicate_pending = self.state.account_requests.iter().any(|r| {
            r.status == AccountRequestStatus::Pending && normalize_email(&r.email) == email_key
        });
        if duplicate_pending {
            return Err(StorageError::Conflict {
                table: ACCOUNT_REQUESTS,
                key: email_key,
                reason: "a pending request already exists for this email",
            });
        }
        let row = AccountRequest {
            id: Uuid::new_v4(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email.trim().to_string(),
            department: input.department,
            job_title: input.job_title,
            reason: input.reason,
            status: AccountRequestStatus::Pending,
            request_date: now.date_naive().format("%Y-%m-%d").to_string(),
            reviewed_by: None,
            reviewed_date: None,
            review_notes: None,
            created_at: now,
            updated_at: now,
        };
        let mut staged = self.state.clone();
        staged.account_requests.push(row.clone());
        self.commit(staged)?;
        Ok(row)
    }

    fn pending_request_index(&self, id: &Uuid) -> Result<usize, StorageError> {
        let idx = self
            .state
            .account_requests
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| StorageError::not_found(ACCOUNT_REQUESTS, id))?;
        if self.state.account_requests[idx].status != AccountRequestStatus::Pending {
            return Err(StorageError::Conflict {
                table: ACCOUNT_REQUESTS,
                key: id.to_string(),
                reason: "request has already been reviewed",
            });
        }
        Ok(idx)
    }

    /// Marks the request approved and creates an active Staff user for it with
    /// a temporary password, in one save.
    pub fn approve_account_request(
        &mut self,
        id: &Uuid,
        review: AccountReview,
        now: DateTime<Utc>,
    ) -> Result<ApprovedAccount, StorageError> {
        review.validate()?;
        let idx = self.pending_request_index(id)?;
        let email_key = normalize_email(&self.state.account_requests[idx].email);
        if self.user_by_email(&email_key).is_some() {
            return Err(StorageError::Conflict {
                table: USERS,
                key: email_key,
                reason: "a user with this email already exists",
            });
        }

        let mut staged = self.state.clone();
        let request = &mut staged.account_requests[idx];
        request.status = AccountRequestStatus::Approved;
        request.reviewed_by = Some(review.reviewed_by);
        request.reviewed_date = Some(now);
        request.review_notes = review.review_notes;
        request.updated_at = now;
        let request = request.clone();

        let user_id = Uuid::new_v4();
        let temporary_password = temporary_password();
        let user = User {
            id: user_id,
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            department: request.department.clone(),
            job_title: request.job_title.clone(),
            role: UserRole::Staff,
            active: true,
            password_hash: hash_password(&user_id, &temporary_password),
            created_at: now,
            updated_at: now,
        };
        staged.users.push(user.clone());
        self.commit(staged)?;
        Ok(ApprovedAccount {
            request,
            user,
            temporary_password,
        })
    }

    pub fn reject_account_request(
        &mut self,
        id: &Uuid,
        review: AccountReview,
        now: DateTime<Utc>,
    ) -> Result<AccountRequest, StorageError> {
        review.validate()?;
        let idx = self.pending_request_index(id)?;
        let mut staged = self.state.clone();
        let request = &mut staged.account_requests[idx];
        request.status = AccountRequestStatus::Rejected;
        request.reviewed_by = Some(review.reviewed_by);
        request.reviewed_date = Some(now);
        request.review_notes = review.review_notes;
        request.updated_at = now;
        let request = request.clone();
        self.commit(staged)?;
        Ok(request)
    }

    pub fn delete_account_request(&mut self, id: &Uuid) -> Result<bool, StorageError> {
        if self.account_request(id).is_none() {
            return Ok(false);
        }
        let mut staged = self.state.clone();
        staged.account_requests.retain(|r| &r.id != id);
        self.commit(staged)?;
        Ok(true)
    }

    // Users

    pub fn user(&self, id: &Uuid) -> Option<&User> {
        self.state.users.iter().find(|u| &u.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let key = normalize_email(email);
        self.state
            .users
            .iter()
            .find(|u| normalize_email(&u.email) == key)
    }

    pub fn users(&self) -> &[User] {
        &self.state.users
    }

    pub fn create_user(&mut self, input: UserInput, now: DateTime<Utc>) -> Result<User, StorageError> {
        input.validate()?;
        if self.user_by_email(&input.email).is_some() {
            return Err(StorageError::Conflict {
                table: USERS,
                key: normalize_email(&input.email),
                reason: "a user with this email already exists",
            });
        }
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: input.email.trim().to_string(),
            first_name: input.first_name,
            last_name: input.last_name,
            department: input.department,
            job_title: input.job_title,
            role: input.role,
            active: true,
            password_hash: hash_password(&id, &input.password),
            created_at: now,
            updated_at: now,
        };
        let mut staged = self.state.clone();
        staged.users.push(user.clone());
        self.commit(staged)?;
        Ok(user)
    }

    pub fn update_user(
        &mut self,
        id: &Uuid,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<User, StorageError> {
        patch.validate()?;
        let idx = self
            .state
            .users
            .iter()
            .position(|u| &u.id == id)
            .ok_or_else(|| StorageError::not_found(USERS, id))?;
        let mut staged = self.state.clone();
        let user = &mut staged.users[idx];
        if let Some(v) = patch.first_name {
            user.first_name = v;
        }
        if let Some(v) = patch.last_name {
            user.last_name = v;
        }
        if let Some(v) = patch.department {
            user.department = v;
        }
        if let Some(v) = patch.job_title {
            user.job_title = v;
        }
        if let Some(v) = patch.role {
            user.role = v;
        }
        if let Some(v) = patch.active {
            user.active = v;
        }
        if let Some(password) = patch.password {
            user.password_hash = hash_password(&user.id, &password);
        }
        user.updated_at = now;
        let updated = user.clone();
        self.commit(staged)?;
        Ok(updated)
    }

    pub fn delete_user(&mut self, id: &Uuid) -> Result<bool, StorageError> {
        if self.user(id).is_none() {
            return Ok(false);
        }
        let mut staged = self.state.clone();
        staged.users.retain(|u| &u.id != id);
        self.commit(staged)?;
        Ok(true)
    }

    /// Unknown email, inactive account and wrong password all report
    /// `Unauthorized`.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<&User, StorageError> {
        let user = self.user_by_email(email).ok_or(StorageError::Unauthorized)?;
        if !user.active || hash_password(&user.id, password) != user.password_hash {
            return Err(StorageError::Unauthorized);
        }
        Ok(user)
    }

    /// Creates an Admin user when the directory has no users yet.
    pub fn seed_admin(
        &mut self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StorageError> {
        if !self.state.users.is_empty() {
            return Ok(None);
        }
        let user = self.create_user(
            UserInput {
                email: email.to_string(),
                first_name: "System".to_string(),
                last_name: "Administrator".to_string(),
                department: "Administration".to_string(),
                job_title: String::new(),
                role: UserRole::Admin,
                password: password.to_string(),
            },
            now,
        )?;
        info!(user_id = %user.id, "seeded initial admin user");
        Ok(Some(user))
    }

    // Departments

    pub fn department(&self, id: &Uuid) -> Option<&Department> {
        self.state.departments.iter().find(|d| &d.id == id)
    }

    pub fn departments(&self) -> &[Department] {
        &self.state.departments
    }

    fn department_name_taken(&self, name: &str, except: Option<&Uuid>) -> bool {
        let key = name.trim().to_ascii_lowercase();
        self.state
            .departments
            .iter()
            .filter(|d| Some(&d.id) != except)
            .any(|d| d.name.trim().to_ascii_lowercase() == key)
    }

    pub fn create_department(
        &mut self,
        input: DepartmentInput,
        now: DateTime<Utc>,
    ) -> Result<Department, StorageError> {
        input.validate()?;
        if self.department_name_taken(&input.name, None) {
            return Err(StorageError::Conflict {
                table: DEPARTMENTS,
                key: input.name.trim().to_string(),
                reason: "a department with this name already exists",
            });
        }
        let row = Department {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            code: input.code,
            description: input.description,
            created_at: now,
        };
        let mut staged = self.state.clone();
        staged.departments.push(row.clone());
        self.commit(staged)?;
        Ok(row)
    }

    pub fn update_department(
        &mut self,
        id: &Uuid,
        patch: DepartmentPatch,
    ) -> Result<Department, StorageError> {
        patch.validate()?;
        let idx = self
            .state
            .departments
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| StorageError::not_found(DEPARTMENTS, id))?;
        if let Some(name) = &patch.name {
            if self.department_name_taken(name, Some(id)) {
                return Err(StorageError::Conflict {
                    table: DEPARTMENTS,
                    key: name.trim().to_string(),
                    reason: "a department with this name already exists",
                });
            }
        }
        let mut staged = self.state.clone();
        let row = &mut staged.departments[idx];
        if let Some(v) = patch.name {
            row.name = v.trim().to_string();
        }
        if let Some(v) = patch.code {
            row.code = v;
        }
        if let Some(v) = patch.description {
            row.description = v;
        }
        let updated = row.clone();
        self.commit(staged)?;
        Ok(updated)
    }

    pub fn delete_department(&mut self, id: &Uuid) -> Result<bool, StorageError> {
        if self.department(id).is_none() {
            return Ok(false);
        }
        let mut staged = self.state.clone();
        staged.departments.retain(|d| &d.id != id);
        self.commit(staged)?;
        Ok(true)
    }
}
