#![forbid(unsafe_code)]

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use civic_storage::persistence::PersistenceMode;

pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;
pub const REFRESH_INTERVAL_MS_MIN: u64 = 100;
pub const REFRESH_INTERVAL_MS_MAX: u64 = 600_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: '{value}' is not a socket address")]
    InvalidBind { key: &'static str, value: String },
    #[error("{key}: '{value}' is not a persistence mode (expected file or memory)")]
    InvalidPersistenceMode { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub bind: SocketAddr,
    pub persistence_mode: PersistenceMode,
    pub data_dir: PathBuf,
    pub refresh_enabled: bool,
    pub refresh_interval_ms: u64,
    pub notify_webhook_url: Option<String>,
    pub admin_seed: Option<AdminSeed>,
}

impl AdapterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset and blank values take
    /// their defaults.
    pub fn from_env_var_map<F>(mut env_getter: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = |key: &str| {
            env_getter(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_bind = get("CIVIC_HTTP_BIND").unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string());
        let bind: SocketAddr = raw_bind.parse().map_err(|_| ConfigError::InvalidBind {
            key: "CIVIC_HTTP_BIND",
            value: raw_bind.clone(),
        })?;
        let persistence_mode = match get("CIVIC_PERSISTENCE") {
            Some(v) => PersistenceMode::parse(&v).ok_or(ConfigError::InvalidPersistenceMode {
                key: "CIVIC_PERSISTENCE",
                value: v,
            })?,
            None => PersistenceMode::File,
        };
        let data_dir = get("CIVIC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(get("HOME")));
        let refresh_enabled = get("CIVIC_REFRESH_ENABLED")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        let refresh_interval_ms = get("CIVIC_REFRESH_INTERVAL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| (REFRESH_INTERVAL_MS_MIN..=REFRESH_INTERVAL_MS_MAX).contains(v))
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS);
        let notify_webhook_url = get("CIVIC_NOTIFY_WEBHOOK_URL");
        let admin_seed = match (get("CIVIC_ADMIN_EMAIL"), get("CIVIC_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(Self {
            bind,
            persistence_mode,
            data_dir,
            refresh_enabled,
            refresh_interval_ms,
            notify_webhook_url,
            admin_seed,
        })
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join(".civic_assets"),
        None => PathBuf::from(".civic_assets"),
    }
}
