use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use warden_acl::{DEFAULT_ERROR_STATUS, DenyAll, WithErrorStatus};

use crate::{ConfigError, Result};

/// HTTP statuses a host may report for denied requests.
pub const ALLOWED_ERROR_STATUSES: [u16; 3] = [401, 403, 404];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WardenConfig {
    #[serde(default)]
    pub access: AccessSettings,
    #[serde(default)]
    pub policy: PolicySettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_ERROR_STATUSES.contains(&self.access.error_status) {
            return Err(ConfigError::validation(format!(
                "access.error_status must be one of {ALLOWED_ERROR_STATUSES:?}"
            )));
        }
        if let Some(file) = self
            .policy
            .files
            .iter()
            .find(|file| file.as_os_str().is_empty())
        {
            return Err(ConfigError::validation(format!(
                "policy.files contains an empty path: {file:?}"
            )));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

/// How denials are reported and when definitions end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSettings {
    /// Status suggested to adapters for denied requests.
    #[serde(default = "default_error_status")]
    pub error_status: u16,
    /// Lock the registry once every policy file is loaded.
    #[serde(default = "default_true")]
    pub lock_after_load: bool,
}

fn default_error_status() -> u16 {
    DEFAULT_ERROR_STATUS
}

fn default_true() -> bool {
    true
}

impl AccessSettings {
    /// Wraps a host adapter so denials report the configured status.
    pub fn adapter<A>(&self, adapter: A) -> WithErrorStatus<A> {
        WithErrorStatus::new(adapter, self.error_status)
    }

    /// A deny-everything adapter reporting the configured status.
    pub fn deny_all(&self) -> DenyAll {
        DenyAll::with_status(self.error_status)
    }
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            error_status: default_error_status(),
            lock_after_load: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicySettings {
    /// Policy documents, defined in order.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
