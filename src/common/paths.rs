use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for rinse

pub const CONFIG_FILE_NAME: &str = "rinse.conf";
pub const VERSION_FILE_NAME: &str = ".version";

/// Get the rinse config directory, creating it if needed
pub fn rinse_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .context("Unable to determine user config directory")?
        .join("rinse");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the path of the main config file
pub fn config_file() -> Result<PathBuf> {
    Ok(rinse_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the path of the self-update version marker
pub fn version_marker_file() -> Result<PathBuf> {
    Ok(rinse_config_dir()?.join(VERSION_FILE_NAME))
}

/// Directory used to unpack and build a source archive
pub fn build_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rinse-build-{}", name))
}
