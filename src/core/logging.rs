//! Diagnostic logging via `tracing`.
//!
//! Output goes to stderr so stdout stays clean for command results. The
//! `SCOUT_LOG` variable takes any `EnvFilter` directive and wins over the
//! verbosity flag.

use crate::core::error::ScoutError;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const ENV_LOG: &str = "SCOUT_LOG";

pub fn build_env_filter(verbose: bool) -> Result<EnvFilter, ScoutError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_LOG) {
        return Ok(filter);
    }
    let level = if verbose { "debug" } else { "warn" };
    let directive = format!("scout={}", level);
    Ok(EnvFilter::new("warn").add_directive(
        directive
            .parse()
            .map_err(|e| ScoutError::ConfigError(format!("Invalid log directive: {}", e)))?,
    ))
}

/// Installs the global subscriber. A second call keeps the first one.
pub fn init_logging(verbose: bool) -> Result<(), ScoutError> {
    let filter = build_env_filter(verbose)?;
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
    if let Err(e) = installed {
        debug!(error = %e, "tracing subscriber already installed");
    }
    Ok(())
}
