//! Tracing initialization (fmt subscriber with env-filter).
//!
//! Log verbosity is controlled through `RUST_LOG`, defaulting to `info`.
//! Keeping this in its own module leaves room to bolt an OTLP layer onto the
//! registry later without touching `main`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber for the whole process.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
