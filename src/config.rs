// src/config.rs

//! Configuration loading utilities.
//!
//! Everything here runs before the first channel is touched; any error is
//! fatal to the run.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{CaptureConfig, Config};

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)?;
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration in {path:?}: {e}")))?;
    log::info!(
        "Loaded configuration from {} ({} servers)",
        path.display(),
        config.servers.len()
    );
    Ok(config)
}

/// Read the capture credential from the configured environment variable.
pub fn resolve_token(capture: &CaptureConfig) -> Result<String> {
    match std::env::var(&capture.token_env) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(AppError::config(format!(
            "{} environment variable not set",
            capture.token_env
        ))),
    }
}
