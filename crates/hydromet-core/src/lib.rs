pub mod config;
pub mod error;

pub use config::{CacheConfig, Config, RetrySettings, UpstreamConfig, ValidationResult};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the hydromet binaries.
///
/// Honors `RUST_LOG`; falls back to `info` when it is unset or invalid.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("hydromet core initialized");
    Ok(())
}
