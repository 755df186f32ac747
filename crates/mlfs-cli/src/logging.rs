// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "MLFS_LOG";

/// Routes tracing output to the log file. The terminal belongs to the grid,
/// so nothing is ever written to stderr once the view is up.
pub fn init(config: &Config) -> Result<PathBuf> {
    let path = config.log_file()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), config.log_level())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(path)
}

fn build_filter(env_override: Option<&str>, configured: &str) -> Result<EnvFilter> {
    match env_override.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV} value {directives:?}")),
        None => EnvFilter::try_new(configured)
            .with_context(|| format!("invalid [log].level {configured:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::build_filter;
    use anyhow::Result;

    #[test]
    fn configured_level_is_used_without_override() -> Result<()> {
        let filter = build_filter(None, "debug")?;
        assert!(filter.to_string().contains("debug"));
        Ok(())
    }

    #[test]
    fn env_override_wins_over_config() -> Result<()> {
        let filter = build_filter(Some("mlfs_grid=trace"), "info")?;
        assert!(filter.to_string().contains("mlfs_grid=trace"));
        Ok(())
    }

    #[test]
    fn blank_override_falls_back_to_config() -> Result<()> {
        let filter = build_filter(Some("  "), "warn")?;
        assert!(filter.to_string().contains("warn"));
        Ok(())
    }

    #[test]
    fn invalid_directive_is_rejected() {
        let error = build_filter(Some("mlfs=loud"), "info").expect_err("bad level should fail");
        assert!(error.to_string().contains("MLFS_LOG"));
    }
}
