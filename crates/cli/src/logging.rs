use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::CliConfig;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Logs go to stderr so command output stays clean.
pub fn init_logging(config: &CliConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.log_json {
        registry
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()
    } else {
        registry
            .with(Layer::new().with_writer(io::stderr).with_target(false))
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tracing::debug!(
        "Logging initialized (level: {}, format: {})",
        config.log_level,
        if config.log_json { "JSON" } else { "text" }
    );
    Ok(())
}
