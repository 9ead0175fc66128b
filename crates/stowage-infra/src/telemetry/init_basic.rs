use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "stowage=info,audit=info";

#[derive(Debug, thiserror::Error)]
#[error("failed to initialize tracing: {0}")]
pub struct TelemetryError(String);

/// Initialize tracing with an `EnvFilter` (from `RUST_LOG`, else
/// `default_filter`, else `stowage=info,audit=info`).
///
/// Output goes to stderr; `json` switches the fmt layer to JSON lines. Fails
/// if a global subscriber is already installed.
pub fn init_telemetry(
    service_name: &str,
    default_filter: Option<&str>,
    json: bool,
) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.unwrap_or(DEFAULT_FILTER).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| TelemetryError(e.to_string()))?;

    tracing::debug!(service = %service_name, json = json, "Tracing initialized");
    Ok(())
}
