//! Subscriber setup for hosts that want the engine's `tracing` output.

use anyhow::anyhow;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::SessionConfig;

/// Installs `color-eyre` and a global subscriber. `RUST_LOG` overrides the
/// configured filter.
pub fn init_logging(config: &SessionConfig) -> anyhow::Result<()> {
    color_eyre::install().map_err(|e| anyhow!("failed to install color-eyre: {e}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    if config.log_json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }
    Ok(())
}
