use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Diagnostics go to stderr so stdout stays
/// clean for command output and `--json`.
///
/// An explicit `level` wins over `RUST_LOG`; JSON output is selected with
/// `FIVETHIRTY_LOG_FORMAT=json`.
pub fn init(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("Invalid log level '{level}': {e}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let json = std::env::var("FIVETHIRTY_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;
    Ok(())
}
