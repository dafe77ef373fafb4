//! Configuration types.

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

pub const ENV_DB_PATH: &str = "WELLNESS_DB_PATH";
pub const ENV_HTTP_PORT: &str = "WELLNESS_HTTP_PORT";
pub const ENV_LOG_DIR: &str = "WELLNESS_LOG_DIR";
pub const ENV_IN_MEMORY: &str = "WELLNESS_IN_MEMORY";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// libSQL file holding both key-value stores.
    pub db_path: PathBuf,
    /// Port for the JSON action surface.
    pub http_port: u16,
    /// Directory for a daily rolling log file. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
    /// Use in-memory stores (nothing survives a restart).
    pub in_memory: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/wellness.db"),
            http_port: 8080,
            log_dir: None,
            in_memory: false,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    /// Read configuration through `lookup`; unset or empty variables take
    /// their defaults.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(port) = get(ENV_HTTP_PORT) {
            config.http_port = port.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_HTTP_PORT.to_string(),
                message: format!("{port:?} is not a port number: {e}"),
            })?;
        }

        config.log_dir = get(ENV_LOG_DIR).map(PathBuf::from);

        if let Some(flag) = get(ENV_IN_MEMORY) {
            config.in_memory = parse_bool(&flag).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_IN_MEMORY.to_string(),
                message: format!("{flag:?} is not a boolean"),
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
