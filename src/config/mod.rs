//! Marketplace configuration.
//!
//! `VERITYBRIDGE_CONFIG` may hold a JSON object, a path to a JSON file, or a
//! `key=value,key=value` list. `FIRESTORE_EMULATOR_HOST` overrides the emulator
//! host when set.

use std::env;
use std::fmt;
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::identity::DEFAULT_LOGIN_PAGE;

pub const CONFIG_ENV_VAR: &str = "VERITYBRIDGE_CONFIG";
pub const EMULATOR_ENV_VAR: &str = "FIRESTORE_EMULATOR_HOST";
pub const DEFAULT_DATABASE: &str = "(default)";
pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_FAVORITES_POLL_INTERVAL_MS: u64 = 5_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketplaceConfig {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub database: String,
    pub emulator_host: Option<String>,
    pub admin_email: Option<String>,
    pub login_page: String,
    pub geocoder_endpoint: String,
    #[serde(deserialize_with = "millis_from_number_or_string")]
    pub favorites_poll_interval_ms: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            api_key: None,
            database: DEFAULT_DATABASE.to_string(),
            emulator_host: None,
            admin_email: None,
            login_page: DEFAULT_LOGIN_PAGE.to_string(),
            geocoder_endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            favorites_poll_interval_ms: DEFAULT_FAVORITES_POLL_INTERVAL_MS,
        }
    }
}

impl MarketplaceConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = match env::var(CONFIG_ENV_VAR) {
            Ok(raw) => Self::from_source(&raw)?,
            Err(_) => Self::default(),
        };
        if let Ok(host) = env::var(EMULATOR_ENV_VAR) {
            if !host.trim().is_empty() {
                config.emulator_host = Some(host.trim().to_string());
            }
        }
        Ok(config)
    }

    /// Parses a JSON object, a JSON file path, or a `key=value` list.
    pub fn from_source(raw: &str) -> ConfigResult<Self> {
        let value = parse_config_source(raw)
            .ok_or_else(|| ConfigError::Unreadable(format!("cannot read configuration from {raw:?}")))?;
        serde_json::from_value(value).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn require_project_id(&self) -> ConfigResult<&str> {
        self.project_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingField("projectId"))
    }

    pub fn favorites_poll_interval(&self) -> Duration {
        Duration::from_millis(self.favorites_poll_interval_ms.max(1))
    }

    /// Case-insensitive match against the configured administrator email.
    pub fn is_admin_email(&self, email: Option<&str>) -> bool {
        match (email, self.admin_email.as_deref()) {
            (Some(email), Some(admin)) if !admin.trim().is_empty() => {
                email.trim().eq_ignore_ascii_case(admin.trim())
            }
            _ => false,
        }
    }
}

fn parse_config_source(raw: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str::<Value>(raw) {
        if json.is_object() {
            return Some(json);
        }
    }

    if let Some(path) = treat_as_path(raw) {
        if let Ok(contents) = fs::read_to_string(&path) {
            if let Ok(json) = serde_json::from_str::<Value>(&contents) {
                if json.is_object() {
                    return Some(json);
                }
            }
        }
    }

    parse_key_value_config(raw)
}

#[cfg(not(target_arch = "wasm32"))]
fn treat_as_path(raw: &str) -> Option<String> {
    if raw.contains('=') {
        return None;
    }
    let trimmed = raw.trim();
    if Path::new(trimmed).is_file() {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(target_arch = "wasm32")]
fn treat_as_path(_raw: &str) -> Option<String> {
    None
}

fn parse_key_value_config(raw: &str) -> Option<Value> {
    let mut map = Map::new();
    for entry in raw.split(',') {
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Key/value sources carry every value as a string.
fn millis_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("invalid interval `{number}`"))),
        Value::String(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("invalid interval `{raw}`"))),
        other => Err(de::Error::custom(format!("invalid interval `{other}`"))),
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Unreadable(String),
    Invalid(String),
    MissingField(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Unreadable(message) => write!(f, "Unreadable configuration: {message}"),
            ConfigError::Invalid(message) => write!(f, "Invalid configuration: {message}"),
            ConfigError::MissingField(field) => {
                write!(f, "Configuration is missing required field `{field}`")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
