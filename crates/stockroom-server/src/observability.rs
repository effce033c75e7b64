// Tracing initialization with a configurable and reloadable log level.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

pub fn init_tracing() {
    init_tracing_with_level("info", false);
}

pub fn init_tracing_from_config(cfg: &LoggingConfig) {
    init_tracing_with_level(&cfg.level, cfg.json);
}

/// `RUST_LOG` wins over `level` when set. Repeated calls are no-ops.
pub fn init_tracing_with_level(level: &str, json: bool) {
    let base_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let output = if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(output)
        .try_init();
}

/// Apply a new logging level at runtime if the reload handle is configured.
pub fn apply_logging_level(level: &str) {
    if let Some(handle) = LOG_RELOAD_HANDLE.get() {
        let _ = handle.modify(|f| {
            *f = EnvFilter::new(level);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_level_can_change() {
        init_tracing_with_level("warn", false);
        init_tracing_with_level("debug", true);
        apply_logging_level("info");
        tracing::info!("still alive");
    }
}
