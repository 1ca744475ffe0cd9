//! File-only tracing setup. The terminal belongs to the menu, so nothing is
//! ever written to stdout or stderr from here.

use std::fs::{self, OpenOptions};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// `RUST_LOG` when present, otherwise the configured level.
fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))
}

/// Install the global subscriber, appending to the configured log file.
pub fn init(config: &Config) -> Result<()> {
    let path = config.log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(true)
        .with_writer(log_file)
        .with_env_filter(build_env_filter(&config.logging.level)?)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;

    tracing::info!(file = %path.display(), level = %config.logging.level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_parses() {
        assert!(EnvFilter::try_new("debug").is_ok());
        assert!(EnvFilter::try_new("reading_statistics=trace,warn").is_ok());
    }
}
