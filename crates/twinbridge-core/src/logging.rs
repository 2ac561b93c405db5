//! Logging initialization for host processes.

use crate::config::env_vars;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "twinbridge=info";

/// Install the global `tracing` subscriber.
///
/// JSON output is selected with `TWINBRIDGE_LOG_JSON=true` (production and
/// container environments); otherwise a compact human-readable format is used.
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::util::SubscriberInitExt;

    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(DEFAULT_FILTER).add_directive(level.into())
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .finish()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .finish()
            .try_init()
    }
}
