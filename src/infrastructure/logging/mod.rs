// Logging module - Diagnostics on stderr
use crate::domain::error::{SerTermError, SerTermResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(level: &str, verbose: bool) -> String {
    if verbose {
        "serterm=debug,warn".to_string()
    } else {
        match level {
            "error" | "warn" | "info" | "debug" | "trace" => format!("serterm={},warn", level),
            _ => "serterm=warn,warn".to_string(),
        }
    }
}

/// Initialize logging system. Diagnostics go to stderr so they never mix
/// with device output on stdout.
pub fn init_logging(level: &str, verbose: bool) -> SerTermResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| SerTermError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("SerTerm logging system initialized");
    Ok(())
}
