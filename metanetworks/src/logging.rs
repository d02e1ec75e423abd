//! Log setup for the provider process
//!
//! Terraform owns stdout for the plugin handshake, so logs go to stderr.

use tracing::Level;

pub const LOG_LEVEL_ENV: &str = "TF_LOG";

/// Map a `TF_LOG` value to a level. Unknown or empty values fall back to INFO.
pub fn level_from_env(value: Option<&str>) -> Level {
    match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
        Some("TRACE") => Level::TRACE,
        Some("DEBUG") => Level::DEBUG,
        Some("WARN") => Level::WARN,
        Some("ERROR") => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber. Later calls leave the first one in place.
pub fn init() {
    let level = level_from_env(std::env::var(LOG_LEVEL_ENV).ok().as_deref());
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialised at {}", level);
    }
}
