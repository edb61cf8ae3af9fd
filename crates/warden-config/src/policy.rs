//! Policy documents.
//!
//! A policy document lists declarations in the same shapes the registry
//! accepts, as TOML:
//!
//! ```toml
//! [[declarations]]
//! resource = "Book"
//! action = "read,write"
//!
//! [[declarations]]
//! role = "Reader"
//! access = "Book.read"
//! ```
//!
//! or as JSON, `{ "declarations": [ ... ] }`.

use std::path::Path;

use serde::Deserialize;
use warden_acl::{Declaration, Registry};

use crate::{ConfigError, Result, WardenConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl PolicyDocument {
    /// Parses a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConfigError::parse(format!("policy toml error: {e}")))
    }

    /// Parses a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ConfigError::parse(format!("policy json error: {e}")))
    }

    /// Defines every declaration as one transaction.
    pub fn apply(&self, registry: &mut Registry) -> warden_acl::AccessResult<()> {
        registry.define_all(&self.declarations)
    }
}

/// Reads a policy document, choosing the format by file extension.
pub fn load_policy_file(path: impl AsRef<Path>) -> Result<PolicyDocument> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => PolicyDocument::from_toml(&text),
        Some("json") => PolicyDocument::from_json(&text),
        _ => Err(ConfigError::validation(format!(
            "unsupported policy format: {}",
            path.display()
        ))),
    }
}

/// Builds a registry from every configured policy file, in order. The
/// registry is locked afterwards when `access.lock_after_load` is set.
pub fn build_registry(config: &WardenConfig) -> Result<Registry> {
    let mut registry = Registry::new();
    for file in &config.policy.files {
        let document = load_policy_file(file)?;
        document
            .apply(&mut registry)
            .map_err(|e| ConfigError::policy(file.display().to_string(), e))?;
        tracing::info!(
            file = %file.display(),
            declarations = document.declarations.len(),
            "loaded policy"
        );
    }
    if config.access.lock_after_load {
        registry.lock();
    }
    Ok(registry)
}
