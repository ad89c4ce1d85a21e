#![forbid(unsafe_code)]

pub mod config;
pub mod http;
pub mod notify;
pub mod refresh;

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use civic_contracts::directory::{
    AccountRequest, AccountRequestInput, AccountRequestStatus, AccountReview, UserProfile,
};
use civic_contracts::navigation::{navigation_for_role, NavEntry};
use civic_contracts::ContractViolation;
use civic_storage::directory::DirectoryStore;
use civic_storage::ledger::LedgerStore;
use civic_storage::persistence::{InMemoryPersistence, JsonFilePersistence, PersistenceMode};
use civic_storage::views::{dashboard_summary, unparseable_maintenance_dates, DashboardSummary};
use civic_storage::StorageError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AdapterConfig;
use crate::notify::{dispatch, LogNotifier, Notification, NotificationKind, Notifier, WebhookNotifier};

pub type SharedRuntime = Arc<Mutex<AdapterRuntime>>;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error("{0}")]
    BadRequest(String),
    #[error("{what} '{key}' not found")]
    NotFound { what: &'static str, key: String },
    #[error("{0}")]
    Internal(String),
}

impl AdapterError {
    pub fn not_found(what: &'static str, key: impl ToString) -> Self {
        AdapterError::NotFound {
            what,
            key: key.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AdapterError::Storage(StorageError::NotFound { .. }) | AdapterError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AdapterError::Storage(StorageError::Conflict { .. }) => StatusCode::CONFLICT,
            AdapterError::Storage(StorageError::Unauthorized) => StatusCode::UNAUTHORIZED,
            AdapterError::Storage(StorageError::ContractViolation(_))
            | AdapterError::Contract(_)
            | AdapterError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdapterError::Storage(StorageError::Persistence { .. }) | AdapterError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub reason: String,
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                status: "error".to_string(),
                reason: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterHealthResponse {
    pub status: String,
    pub assets: usize,
    pub ledger_rows: usize,
    pub next_id: u64,
    pub users: usize,
    pub pending_account_requests: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserProfile,
    pub navigation: Vec<NavEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedAccountResponse {
    pub request: AccountRequest,
    pub user: UserProfile,
    pub temporary_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdValidityResponse {
    pub id: String,
    pub valid: bool,
}

/// Everything a request handler needs: both stores and the notifier. Lives
/// behind one mutex, so each operation runs to completion before the next.
pub struct AdapterRuntime {
    ledger: LedgerStore,
    directory: DirectoryStore,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for AdapterRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRuntime")
            .field("ledger", &self.ledger)
            .field("directory", &self.directory)
            .finish()
    }
}

impl Default for AdapterRuntime {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl AdapterRuntime {
    pub fn new(ledger: LedgerStore, directory: DirectoryStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            ledger,
            directory,
            notifier,
        }
    }

    pub fn new_in_memory() -> Self {
        let persistence = InMemoryPersistence::default();
        Self::new(
            LedgerStore::open(Box::new(persistence.clone())),
            DirectoryStore::open(Box::new(persistence)),
            Arc::new(LogNotifier),
        )
    }

    /// Builds the runtime the config describes and seeds the admin user when
    /// the directory is empty.
    pub fn from_config(config: &AdapterConfig) -> Result<Self, AdapterError> {
        let notifier: Arc<dyn Notifier> = match config.notify_webhook_url.as_deref() {
            Some(url) => {
                info!(url, "notifications go to webhook");
                Arc::new(WebhookNotifier::new(url))
            }
            None => Arc::new(LogNotifier),
        };
        let mut runtime = match config.persistence_mode {
            PersistenceMode::File => {
                let persistence = JsonFilePersistence::open(&config.data_dir)?;
                info!(
                    mode = config.persistence_mode.as_str(),
                    data_dir = %config.data_dir.display(),
                    "persistence selected"
                );
                Self::new(
                    LedgerStore::open(Box::new(persistence.clone())),
                    DirectoryStore::open(Box::new(persistence)),
                    notifier,
                )
            }
            PersistenceMode::Memory => {
                info!(mode = config.persistence_mode.as_str(), "persistence selected");
                let persistence = InMemoryPersistence::default();
                Self::new(
                    LedgerStore::open(Box::new(persistence.clone())),
                    DirectoryStore::open(Box::new(persistence)),
                    notifier,
                )
            }
        };
        if let Some(seed) = &config.admin_seed {
            runtime
                .directory
                .seed_admin(&seed.email, &seed.password, Utc::now())?;
        }
        Ok(runtime)
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut LedgerStore {
        &mut self.ledger
    }

    pub fn directory(&self) -> &DirectoryStore {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut DirectoryStore {
        &mut self.directory
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        let snapshot = self.ledger.snapshot();
        AdapterHealthResponse {
            status: "ok".to_string(),
            assets: snapshot.assets.len(),
            ledger_rows: snapshot.row_count(),
            next_id: self.ledger.next_id_value(),
            users: self.directory.users().len(),
            pending_account_requests: self
                .directory
                .account_requests(Some(AccountRequestStatus::Pending))
                .len(),
        }
    }

    /// Re-reads the directory so account requests and users written by other
    /// processes show up. The ledger has a single writer and is not polled.
    pub fn refresh_pass(&mut self) -> bool {
        let applied = self.directory.reload();
        debug!(
            applied,
            users = self.directory.users().len(),
            pending_account_requests = self
                .directory
                .account_requests(Some(AccountRequestStatus::Pending))
                .len(),
            "refresh pass complete"
        );
        applied
    }

    pub fn dashboard(&self, now: NaiveDate) -> DashboardSummary {
        let snapshot = self.ledger.snapshot();
        for record in unparseable_maintenance_dates(snapshot) {
            debug!(
                record_id = %record.id,
                scheduled_date = %record.scheduled_date,
                "maintenance record has an unparseable scheduled date; excluded from views"
            );
        }
        dashboard_summary(snapshot, now)
    }

    pub fn submit_account_request(
        &mut self,
        input: AccountRequestInput,
    ) -> Result<AccountRequest, AdapterError> {
        let request = self.directory.create_account_request(input, Utc::now())?;
        dispatch(
            &self.notifier,
            Notification {
                kind: NotificationKind::AccountRequestSubmitted,
                recipient: request.email.clone(),
                subject: "Account request received".to_string(),
                body: format!(
                    "Hello {}, your account request for {} is pending review.",
                    request.first_name, request.department
                ),
            },
        );
        Ok(request)
    }

    pub fn approve_account_request(
        &mut self,
        id: &Uuid,
        review: AccountReview,
    ) -> Result<ApprovedAccountResponse, AdapterError> {
        let approved = self
            .directory
            .approve_account_request(id, review, Utc::now())?;
        dispatch(
            &self.notifier,
            Notification {
                kind: NotificationKind::AccountRequestApproved,
                recipient: approved.request.email.clone(),
                subject: "Account request approved".to_string(),
                body: format!(
                    "Hello {}, your account is active. Sign in with your email and the temporary password provided by your administrator.",
                    approved.request.first_name
                ),
            },
        );
        Ok(ApprovedAccountResponse {
            user: UserProfile::from(&approved.user),
            request: approved.request,
            temporary_password: approved.temporary_password,
        })
    }

    pub fn reject_account_request(
        &mut self,
        id: &Uuid,
        review: AccountReview,
    ) -> Result<AccountRequest, AdapterError> {
        let request = self
            .directory
            .reject_account_request(id, review, Utc::now())?;
        let mut body = format!(
            "Hello {}, your account request was not approved.",
            request.first_name
        );
        if let Some(notes) = request.review_notes.as_deref().filter(|n| !n.trim().is_empty()) {
            body.push_str(&format!(" Reviewer notes: {notes}"));
        }
        dispatch(
            &self.notifier,
            Notification {
                kind: NotificationKind::AccountRequestRejected,
                recipient: request.email.clone(),
                subject: "Account request rejected".to_string(),
                body,
            },
        );
        Ok(request)
    }

    pub fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AdapterError> {
        let user = self
            .directory
            .authenticate(&request.email, &request.password)?;
        Ok(LoginResponse {
            navigation: navigation_for_role(user.role),
            user: UserProfile::from(user),
        })
    }

    pub fn navigation_for_user(&self, id: &Uuid) -> Result<Vec<NavEntry>, AdapterError> {
        let user = self
            .directory
            .user(id)
            .ok_or_else(|| AdapterError::not_found("user", id))?;
        Ok(navigation_for_role(user.role))
    }
}
