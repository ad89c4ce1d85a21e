#![forbid(unsafe_code)]

use std::sync::MutexGuard;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use civic_contracts::asset::{Asset, AssetInput, AssetPatch};
use civic_contracts::assignment::{Assignment, AssignmentInput, AssignmentPatch};
use civic_contracts::common::parse_record_date;
use civic_contracts::directory::{
    AccountRequest, AccountRequestInput, AccountRequestStatus, AccountReview, Department,
    DepartmentInput, DepartmentPatch, UserInput, UserPatch, UserProfile,
};
use civic_contracts::maintenance::{MaintenanceInput, MaintenancePatch, MaintenanceRecord};
use civic_contracts::navigation::NavEntry;
use civic_contracts::transfer::{Transfer, TransferInput, TransferPatch};
use civic_contracts::RecordId;
use civic_storage::ids::is_valid_id;
use civic_storage::views::{
    available_assets, maintenance_by_asset, overdue_maintenance_records,
    upcoming_maintenance_records, DashboardSummary,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AdapterError, AdapterHealthResponse, AdapterRuntime, ApprovedAccountResponse,
    IdValidityResponse, LoginRequest, LoginResponse, SharedRuntime,
};

type Reply<T> = Result<Json<T>, AdapterError>;
type Created<T> = Result<(StatusCode, Json<T>), AdapterError>;

pub fn router(runtime: SharedRuntime) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/assets", get(list_assets).post(create_asset))
        .route("/assets/available", get(list_available_assets))
        .route(
            "/assets/:id",
            get(get_asset)
                .put(update_asset)
                .patch(update_asset)
                .delete(delete_asset),
        )
        .route("/assets/:id/maintenance", get(list_asset_maintenance))
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route(
            "/assignments/:id",
            get(get_assignment)
                .put(update_assignment)
                .patch(update_assignment)
                .delete(delete_assignment),
        )
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route(
            "/transfers/:id",
            get(get_transfer)
                .put(update_transfer)
                .patch(update_transfer)
                .delete(delete_transfer),
        )
        .route("/maintenance", get(list_maintenance).post(create_maintenance))
        .route("/maintenance/overdue", get(list_overdue_maintenance))
        .route("/maintenance/upcoming", get(list_upcoming_maintenance))
        .route(
            "/maintenance/:id",
            get(get_maintenance)
                .put(update_maintenance)
                .patch(update_maintenance)
                .delete(delete_maintenance),
        )
        .route("/dashboard", get(dashboard))
        .route("/ids/:id/valid", get(id_validity))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .route("/users/:id/navigation", get(user_navigation))
        .route("/departments", get(list_departments).post(create_department))
        .route(
            "/departments/:id",
            get(get_department)
                .put(update_department)
                .patch(update_department)
                .delete(delete_department),
        )
        .route(
            "/account-requests",
            get(list_account_requests).post(create_account_request),
        )
        .route(
            "/account-requests/:id",
            get(get_account_request).delete(delete_account_request),
        )
        .route("/account-requests/:id/approve", post(approve_account_request))
        .route("/account-requests/:id/reject", post(reject_account_request))
        .route("/auth/login", post(login))
        .with_state(runtime)
}

fn lock(runtime: &SharedRuntime) -> Result<MutexGuard<'_, AdapterRuntime>, AdapterError> {
    runtime
        .lock()
        .map_err(|_| AdapterError::Internal("adapter runtime lock poisoned".to_string()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AdapterError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| AdapterError::BadRequest(rejection.body_text()))
}

fn record_id(raw: String) -> Result<RecordId, AdapterError> {
    Ok(RecordId::new(raw)?)
}

fn uuid_param(raw: &str) -> Result<Uuid, AdapterError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AdapterError::BadRequest(format!("'{raw}' is not a valid id")))
}

fn deleted(found: bool, what: &'static str, key: impl ToString) -> Result<StatusCode, AdapterError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AdapterError::not_found(what, key))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NowQuery {
    pub now: Option<String>,
}

impl NowQuery {
    /// Defaults to today in UTC.
    fn date(&self) -> Result<NaiveDate, AdapterError> {
        match self.now.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => parse_record_date(raw)
                .ok_or_else(|| AdapterError::BadRequest(format!("now: '{raw}' is not a valid date"))),
            None => Ok(Utc::now().date_naive()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

async fn healthz(State(runtime): State<SharedRuntime>) -> Reply<AdapterHealthResponse> {
    Ok(Json(lock(&runtime)?.health_report()))
}

// Assets

async fn list_assets(State(runtime): State<SharedRuntime>) -> Reply<Vec<Asset>> {
    Ok(Json(lock(&runtime)?.ledger().assets().to_vec()))
}

async fn list_available_assets(State(runtime): State<SharedRuntime>) -> Reply<Vec<Asset>> {
    let runtime = lock(&runtime)?;
    Ok(Json(
        available_assets(runtime.ledger().snapshot())
            .into_iter()
            .cloned()
            .collect(),
    ))
}

async fn create_asset(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<AssetInput>, JsonRejection>,
) -> Created<Asset> {
    let input = body(payload)?;
    let asset = lock(&runtime)?.ledger_mut().create_asset(input)?;
    Ok((StatusCode::CREATED, Json(asset)))
}

async fn get_asset(State(runtime): State<SharedRuntime>, Path(id): Path<String>) -> Reply<Asset> {
    let id = record_id(id)?;
    let runtime = lock(&runtime)?;
    runtime
        .ledger()
        .asset(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AdapterError::not_found("asset", &id))
}

async fn update_asset(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<AssetPatch>, JsonRejection>,
) -> Reply<Asset> {
    let id = record_id(id)?;
    let patch = body(payload)?;
    Ok(Json(lock(&runtime)?.ledger_mut().update_asset(&id, patch)?))
}

async fn delete_asset(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdapterError> {
    let id = record_id(id)?;
    let found = lock(&runtime)?.ledger_mut().delete_asset(&id)?;
    deleted(found, "asset", &id)
}

async fn list_asset_maintenance(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<Vec<MaintenanceRecord>> {
    let id = record_id(id)?;
    let runtime = lock(&runtime)?;
    Ok(Json(
        maintenance_by_asset(runtime.ledger().snapshot(), &id)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

// Assignments

async fn list_assignments(State(runtime): State<SharedRuntime>) -> Reply<Vec<Assignment>> {
    Ok(Json(lock(&runtime)?.ledger().assignments().to_vec()))
}

async fn create_assignment(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<AssignmentInput>, JsonRejection>,
) -> Created<Assignment> {
    let input = body(payload)?;
    let row = lock(&runtime)?.ledger_mut().create_assignment(input)?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn get_assignment(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<Assignment> {
    let id = record_id(id)?;
    let runtime = lock(&runtime)?;
    runtime
        .ledger()
        .assignment(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AdapterError::not_found("assignment", &id))
}

async fn update_assignment(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<AssignmentPatch>, JsonRejection>,
) -> Reply<Assignment> {
    let id = record_id(id)?;
    let patch = body(payload)?;
    Ok(Json(
        lock(&runtime)?.ledger_mut().update_assignment(&id, patch)?,
    ))
}

async fn delete_assignment(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdapterError> {
    let id = record_id(id)?;
    let found = lock(&runtime)?.ledger_mut().delete_assignment(&id)?;
    deleted(found, "assignment", &id)
}

// Transfers

async fn list_transfers(State(runtime): State<SharedRuntime>) -> Reply<Vec<Transfer>> {
    Ok(Json(lock(&runtime)?.ledger().transfers().to_vec()))
}

async fn create_transfer(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<TransferInput>, JsonRejection>,
) -> Created<Transfer> {
    let input = body(payload)?;
    let row = lock(&runtime)?.ledger_mut().create_transfer(input)?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn get_transfer(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<Transfer> {
    let id = record_id(id)?;
    let runtime = lock(&runtime)?;
    runtime
        .ledger()
        .transfer(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AdapterError::not_found("transfer", &id))
}

async fn update_transfer(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<TransferPatch>, JsonRejection>,
) -> Reply<Transfer> {
    let id = record_id(id)?;
    let patch = body(payload)?;
    Ok(Json(lock(&runtime)?.ledger_mut().update_transfer(&id, patch)?))
}

async fn delete_transfer(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdapterError> {
    let id = record_id(id)?;
    let found = lock(&runtime)?.ledger_mut().delete_transfer(&id)?;
    deleted(found, "transfer", &id)
}

// Maintenance

async fn list_maintenance(State(runtime): State<SharedRuntime>) -> Reply<Vec<MaintenanceRecord>> {
    Ok(Json(lock(&runtime)?.ledger().maintenance_records().to_vec()))
}

async fn list_overdue_maintenance(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<NowQuery>,
) -> Reply<Vec<MaintenanceRecord>> {
    let now = query.date()?;
    let runtime = lock(&runtime)?;
    Ok(Json(
        overdue_maintenance_records(runtime.ledger().snapshot(), now)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

async fn list_upcoming_maintenance(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<NowQuery>,
) -> Reply<Vec<MaintenanceRecord>> {
    let now = query.date()?;
    let runtime = lock(&runtime)?;
    Ok(Json(
        upcoming_maintenance_records(runtime.ledger().snapshot(), now)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

async fn create_maintenance(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<MaintenanceInput>, JsonRejection>,
) -> Created<MaintenanceRecord> {
    let input = body(payload)?;
    let row = lock(&runtime)?
        .ledger_mut()
        .create_maintenance_record(input)?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn get_maintenance(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<MaintenanceRecord> {
    let id = record_id(id)?;
    let runtime = lock(&runtime)?;
    runtime
        .ledger()
        .maintenance_record(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AdapterError::not_found("maintenance record", &id))
}

async fn update_maintenance(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<MaintenancePatch>, JsonRejection>,
) -> Reply<MaintenanceRecord> {
    let id = record_id(id)?;
    let patch = body(payload)?;
    Ok(Json(
        lock(&runtime)?
            .ledger_mut()
            .update_maintenance_record(&id, patch)?,
    ))
}

async fn delete_maintenance(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdapterError> {
    let id = record_id(id)?;
    let found = lock(&runtime)?
        .ledger_mut()
        .delete_maintenance_record(&id)?;
    deleted(found, "maintenance record", &id)
}

async fn dashboard(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<NowQuery>,
) -> Reply<DashboardSummary> {
    let now = query.date()?;
    Ok(Json(lock(&runtime)?.dashboard(now)))
}

async fn id_validity(Path(id): Path<String>) -> Json<IdValidityResponse> {
    Json(IdValidityResponse {
        valid: is_valid_id(&id),
        id,
    })
}

// Users

async fn list_users(State(runtime): State<SharedRuntime>) -> Reply<Vec<UserProfile>> {
    let runtime = lock(&runtime)?;
    Ok(Json(
        runtime
            .directory()
            .users()
            .iter()
            .map(UserProfile::from)
            .collect(),
    ))
}

async fn create_user(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> Created<UserProfile> {
    let input = body(payload)?;
    let user = lock(&runtime)?
        .directory_mut()
        .create_user(input, Utc::now())?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

async fn get_user(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<UserProfile> {
    let id = uuid_param(&id)?;
    let runtime = lock(&runtime)?;
    runtime
        .directory()
        .user(&id)
        .map(|u| Json(UserProfile::from(u)))
        .ok_or_else(|| AdapterError::not_found("user", id))
}

async fn update_user(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> Reply<UserProfile> {
    let id = uuid_param(&id)?;
    let patch = body(payload)?;
    let user = lock(&runtime)?
        .directory_mut()
        .update_user(&id, patch, Utc::now())?;
    Ok(Json(UserProfile::from(&user)))
}

async fn delete_user(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdapterError> {
    let id = uuid_param(&id)?;
    let found = lock(&runtime)?.directory_mut().delete_user(&id)?;
    deleted(found, "user", id)
}

async fn user_navigation(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<Vec<NavEntry>> {
    let id = uuid_param(&id)?;
    Ok(Json(lock(&runtime)?.navigation_for_user(&id)?))
}

// Departments

async fn list_departments(State(runtime): State<SharedRuntime>) -> Reply<Vec<Department>> {
    Ok(Json(lock(&runtime)?.directory().departments().to_vec()))
}

async fn create_department(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<DepartmentInput>, JsonRejection>,
) -> Created<Department> {
    let input = body(payload)?;
    let row = lock(&runtime)?
        .directory_mut()
        .create_department(input, Utc::now())?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn get_department(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<Department> {
    let id = uuid_param(&id)?;
    let runtime = lock(&runtime)?;
    runtime
        .directory()
        .department(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AdapterError::not_found("department", id))
}

async fn update_department(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<DepartmentPatch>, JsonRejection>,
) -> Reply<Department> {
    let id = uuid_param(&id)?;
    let patch = body(payload)?;
    Ok(Json(
        lock(&runtime)?
            .directory_mut()
            .update_department(&id, patch)?,
    ))
}

async fn delete_department(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdapterError> {
    let id = uuid_param(&id)?;
    let found = lock(&runtime)?.directory_mut().delete_department(&id)?;
    deleted(found, "department", id)
}

// Account requests

async fn list_account_requests(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<StatusQuery>,
) -> Reply<Vec<AccountRequest>> {
    let status = match query.status.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Some(AccountRequestStatus::parse(raw).ok_or_else(|| {
            AdapterError::BadRequest(format!("status: '{raw}' is not an account request status"))
        })?),
        None => None,
    };
    let runtime = lock(&runtime)?;
    Ok(Json(
        runtime
            .directory()
            .account_requests(status)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

async fn create_account_request(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<AccountRequestInput>, JsonRejection>,
) -> Created<AccountRequest> {
    let input = body(payload)?;
    let request = lock(&runtime)?.submit_account_request(input)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_account_request(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Reply<AccountRequest> {
    let id = uuid_param(&id)?;
    let runtime = lock(&runtime)?;
    runtime
        .directory()
        .account_request(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AdapterError::not_found("account request", id))
}

async fn delete_account_request(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdapterError> {
    let id = uuid_param(&id)?;
    let found = lock(&runtime)?
        .directory_mut()
        .delete_account_request(&id)?;
    deleted(found, "account request", id)
}

async fn approve_account_request(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<AccountReview>, JsonRejection>,
) -> Reply<ApprovedAccountResponse> {
    let id = uuid_param(&id)?;
    let review = body(payload)?;
    Ok(Json(lock(&runtime)?.approve_account_request(&id, review)?))
}

async fn reject_account_request(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
    payload: Result<Json<AccountReview>, JsonRejection>,
) -> Reply<AccountRequest> {
    let id = uuid_param(&id)?;
    let review = body(payload)?;
    Ok(Json(lock(&runtime)?.reject_account_request(&id, review)?))
}

async fn login(
    State(runtime): State<SharedRuntime>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Reply<LoginResponse> {
    let request = body(payload)?;
    Ok(Json(lock(&runtime)?.login(&request)?))
}
