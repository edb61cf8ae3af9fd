//! Configuration for warden.
//!
//! This crate provides:
//! - [`WardenConfig`] with its sections and validation
//! - A loader merging a TOML file with `WARDEN__*` environment overrides
//! - Policy documents (`.toml` or `.json`) compiled into a locked registry
//! - Tracing setup with a reloadable log level

pub mod config;
pub mod loader;
pub mod observability;
pub mod policy;

pub use crate::config::{AccessSettings, LoggingConfig, PolicySettings, WardenConfig};
pub use crate::loader::{load_config, load_config_with_default_path};
pub use crate::policy::{PolicyDocument, build_registry, load_policy_file};

use warden_acl::AccessError;

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Policy error in {file}: {source}")]
    Policy {
        file: String,
        #[source]
        source: AccessError,
    },
}

impl ConfigError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn policy(file: impl Into<String>, source: AccessError) -> Self {
        Self::Policy {
            file: file.into(),
            source,
        }
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
