//! Logging and tracing utilities

use crate::config::LogConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from an explicit [`LogConfig`]
///
/// Fails when the filter directives do not parse or a global subscriber is
/// already installed.
pub fn init_tracing_with(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;
    let json = config.json.then(|| tracing_subscriber::fmt::layer().json());
    let text = (!config.json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()?;
    Ok(())
}
