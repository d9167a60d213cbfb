//! Logging setup
//!
//! `RUST_LOG` wins over the configured level when set.

use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Initialize console logging on stderr
///
/// # Arguments
/// * `level` - Log level or filter directive (e.g. "info", "printflow=debug")
/// * `json_format` - JSON lines instead of human readable output
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if json_format {
        let console_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed();
        subscriber.with(console_layer).try_init()?;
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed();
        subscriber.with(console_layer).try_init()?;
    }

    Ok(())
}
