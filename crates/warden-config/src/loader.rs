use std::path::{Path, PathBuf};

use config::{Config, Environment, File};

use crate::{ConfigError, Result, WardenConfig};

/// File read when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "warden.toml";

pub fn load_config(path: Option<&str>) -> Result<WardenConfig> {
    let mut builder = Config::builder();
    let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
    if pathbuf.exists() {
        builder = builder.add_source(File::from(pathbuf));
    } else if path.is_some() {
        tracing::warn!(path = %pathbuf.display(), "config file not found, using defaults");
    }
    // Environment variable overrides, e.g., WARDEN__ACCESS__ERROR_STATUS=404
    builder = builder.add_source(
        Environment::with_prefix("WARDEN")
            .try_parsing(true)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("policy.files"),
    );
    let cfg = builder
        .build()
        .map_err(|e| ConfigError::parse(format!("config build error: {e}")))?;
    let merged: WardenConfig = cfg
        .try_deserialize()
        .map_err(|e| ConfigError::parse(format!("config deserialize error: {e}")))?;
    merged.validate()?;
    Ok(merged)
}

pub fn load_config_with_default_path<P: AsRef<Path>>(path: Option<P>) -> Result<WardenConfig> {
    let p = path
        .as_ref()
        .map(|p| p.as_ref().to_string_lossy().to_string());
    load_config(p.as_deref())
}
