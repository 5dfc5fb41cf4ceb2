pub mod config;

pub use config::{Config, LocationConfig, ProviderConfig, RefreshConfig, ValidationResult};

use anyhow::Result;

/// Initialize process-wide concerns (logging).
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Stormwarn core initialized");
    Ok(())
}
