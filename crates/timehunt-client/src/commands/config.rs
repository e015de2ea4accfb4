//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Renders the configuration as TOML with plain-text secrets masked.
pub fn render(config: &ClientConfig) -> ClientResult<String> {
    #[allow(unused_mut)]
    let mut shown = config.clone();

    #[cfg(feature = "google")]
    if let Some(ref mut google) = shown.google {
        google.client_secret = google.client_secret.as_deref().map(crate::secret::redact);
    }

    toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", path.display());
    println!("{}", render(config)?);
    Ok(())
}

/// Checks every section, returning what was verified.
pub fn check(config: &ClientConfig) -> ClientResult<Vec<&'static str>> {
    let mut verified = Vec::new();

    config.display.to_display_options()?;
    verified.push("Display settings are valid.");

    if config.fix.max_auth_attempts == 0 {
        return Err(ClientError::Config(
            "[fix] max_auth_attempts must be at least 1".to_string(),
        ));
    }

    #[cfg(feature = "google")]
    if let Some(ref google) = config.google {
        if google.calendar_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ClientError::Config(
                "[google] calendar_id must not be empty".to_string(),
            ));
        }

        if google.client_id.is_some() || google.client_secret.is_some() {
            google
                .resolve_credentials()
                .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;
            verified.push("Google credentials are valid.");
        }
    }

    Ok(verified)
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    for line in check(config)? {
        println!("{}", line);
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
