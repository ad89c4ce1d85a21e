#![forbid(unsafe_code)]

use serde::Serialize;

use crate::directory::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

const fn entry(key: &'static str, label: &'static str, path: &'static str) -> NavEntry {
    NavEntry { key, label, path }
}

const COMMON: [NavEntry; 5] = [
    entry("dashboard", "Dashboard", "/dashboard"),
    entry("assets", "Assets", "/assets"),
    entry("assignments", "Assignments", "/assignments"),
    entry("transfers", "Transfers", "/transfers"),
    entry("maintenance", "Maintenance", "/maintenance"),
];

const DEPARTMENTS: NavEntry = entry("departments", "Departments", "/departments");
const USERS: NavEntry = entry("users", "Users", "/users");
const ACCOUNT_REQUESTS: NavEntry = entry("account_requests", "Account Requests", "/account-requests");

/// Ordered navigation entries visible to `role`.
pub fn navigation_for_role(role: UserRole) -> Vec<NavEntry> {
    let mut out = COMMON.to_vec();
    match role {
        UserRole::Staff => {}
        UserRole::Manager => out.push(DEPARTMENTS),
        UserRole::Admin => {
            out.push(DEPARTMENTS);
            out.push(USERS);
            out.push(ACCOUNT_REQUESTS);
        }
    }
    out
}
