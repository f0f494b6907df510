/// `load_config` module: loads the package config from disk and resolves runtime settings
/// (credentials, site URL) from the environment.
///
/// This module is the only place where the on-disk JSON is read; the core crate only ever
/// sees a validated [`PackageConfig`].
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced
/// at the CLI boundary.
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info};
use vishop_core::config::PackageConfig;
use vishop_core::site::DEFAULT_BASE_URL;

/// Username variables, in lookup order.
pub const USERNAME_VARS: [&str; 2] = ["VISHOP_USERNAME", "VIPERS_USERNAME"];
/// Password variables, in lookup order.
pub const PASSWORD_VARS: [&str; 2] = ["VISHOP_PASSWORD", "VIPERS_PASSWORD"];
pub const BASE_URL_VAR: &str = "VISHOP_BASE_URL";

/// Loads and validates a JSON package config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PackageConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match std::fs::read(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config = PackageConfig::from_json_slice(&content)
        .with_context(|| format!("Failed to parse config JSON {path_ref:?}"))?;
    config.trace_loaded();
    Ok(config)
}

/// First non-empty value among `vars`.
pub fn env_fallback(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
}

/// Explicit flag value, else the environment.
pub fn resolve_username(flag: Option<String>) -> Option<String> {
    flag.or_else(|| env_fallback(&USERNAME_VARS))
}

pub fn resolve_password(flag: Option<String>) -> Option<String> {
    flag.or_else(|| env_fallback(&PASSWORD_VARS))
}

pub fn resolve_base_url(flag: Option<String>) -> String {
    flag.or_else(|| env_fallback(&[BASE_URL_VAR]))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}
