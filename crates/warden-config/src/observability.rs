//! Tracing setup driven by the `[logging]` section.
//!
//! `RUST_LOG` takes precedence over the configured level at startup. After
//! that, [`reload_logging`] swaps the filter in place, so a reloaded
//! configuration changes verbosity without reinstalling the subscriber.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

use crate::LoggingConfig;

type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

fn configured_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_new(logging.level.to_ascii_lowercase())
        .unwrap_or_else(|_| EnvFilter::new(LoggingConfig::default().level))
}

/// Installs the global subscriber. Returns `false` if one was already set,
/// in which case only the filter is updated.
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(logging));
    let (layer, handle) = reload::Layer::new(filter);

    if FILTER_HANDLE.set(handle).is_err() {
        return reload_logging(logging);
    }
    let installed = tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer())
        .try_init()
        .is_ok();
    tracing::debug!(level = %logging.level, installed, "tracing initialized");
    installed
}

/// Applies the level from `logging` to the running subscriber. Returns
/// `false` when tracing was never initialized here.
pub fn reload_logging(logging: &LoggingConfig) -> bool {
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };
    let applied = handle
        .modify(|filter| *filter = configured_filter(logging))
        .is_ok();
    if applied {
        tracing::info!(level = %logging.level, "logging level changed");
    }
    applied
}
