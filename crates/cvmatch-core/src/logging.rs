//! Tracing subscriber setup

use crate::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber from configuration.
///
/// `RUST_LOG` overrides the configured level when set. Safe to call once per
/// process; subsequent calls are ignored so test binaries can call it freely.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if config.json_format {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
