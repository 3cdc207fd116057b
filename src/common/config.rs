//! The `rinse.conf` settings file.
//!
//! The format is a flat `key = value` list. `#` starts a comment line and
//! `//` starts a trailing comment. Unknown keys are ignored and malformed
//! values keep their defaults, so a damaged file never stops rinse from
//! running.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::common::paths;
use crate::common::sanitize::{SanitizeContext, sanitize};
use crate::common::time::is_time_value;
use crate::ui::prelude::*;

pub const DEFAULT_CONFIG_URL: &str = "https://raw.githubusercontent.com/Rousevv/rinse/main/rinse.conf";

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Keep source build directories after installing from an archive
    pub keep_build: bool,
    /// Send desktop notifications when operations complete
    pub notify: bool,
    /// Check for rinse updates after a system update
    pub auto_update: bool,
    /// Branch the self-updater follows
    pub update_branch: String,
    /// Default threshold for `rinse outdated`
    pub outdated_time: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_build: false,
            notify: true,
            auto_update: true,
            update_branch: "main".to_string(),
            outdated_time: "6m".to_string(),
        }
    }
}

impl Config {
    /// Load the config file, creating it on first run.
    pub async fn load() -> Result<Self> {
        let path = paths::config_file()?;
        if !path.exists() {
            bootstrap(&path).await?;
        }
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut config = Self::default();

        for line in contents.lines() {
            let mut line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(idx) = line.find("//") {
                line = line[..idx].trim();
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            config.apply(key.trim(), value.trim());
        }

        config
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "keep_build" => set_bool(&mut self.keep_build, value),
            "notify" => set_bool(&mut self.notify, value),
            "auto_update" => set_bool(&mut self.auto_update, value),
            "update_branch" => {
                let branch = sanitize(value, SanitizeContext::Config);
                if !branch.trim().is_empty() {
                    self.update_branch = branch.trim().to_string();
                }
            }
            "outdated_time" => {
                let time = sanitize(value, SanitizeContext::Config);
                if is_time_value(time.trim()) {
                    self.outdated_time = time.trim().to_string();
                }
            }
            _ => {}
        }
    }

    /// The commented default file written when nothing could be downloaded.
    pub fn default_file_contents() -> String {
        let defaults = Self::default();
        format!(
            "# rinse configuration file\n\
             \n\
             # Keep build files after installing from a source archive\n\
             # If true, build directories will be kept in /tmp for debugging\n\
             keep_build = {}\n\
             \n\
             # Send desktop notifications when operations complete\n\
             # Requires notify-send to be installed\n\
             notify = {}\n\
             \n\
             # Automatically check for rinse updates on 'rinse update'\n\
             # Set to false to disable self-updates\n\
             auto_update = {}\n\
             \n\
             # Branch to pull updates from (main or experimental)\n\
             # Use 'experimental' to test bleeding-edge features\n\
             update_branch = {}\n\
             \n\
             # Default time threshold for 'rinse outdated' command\n\
             # Format: Nd (days), Nm (months), Ny (years)\n\
             outdated_time = {}\n",
            defaults.keep_build,
            defaults.notify,
            defaults.auto_update,
            defaults.update_branch,
            defaults.outdated_time,
        )
    }
}

fn set_bool(target: &mut bool, value: &str) {
    match value {
        "true" => *target = true,
        "false" => *target = false,
        _ => {}
    }
}

/// Create the config file, preferring the canonical remote copy.
async fn bootstrap(path: &Path) -> Result<()> {
    let contents = match fetch_default_config().await {
        Some(remote) => remote,
        None => {
            emit(
                Level::Debug,
                "config.bootstrap.generated",
                "Could not download default config, writing built-in defaults",
                None,
            );
            Config::default_file_contents()
        }
    };
    write_config(path, &contents)
}

pub(crate) fn write_config(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing config to {}", path.display()))
}

async fn fetch_default_config() -> Option<String> {
    let client = reqwest::Client::builder()
        .user_agent(format!("rinse/{}", env!("CARGO_PKG_VERSION")))
        .timeout(FETCH_TIMEOUT)
        .build()
        .ok()?;
    let response = client.get(DEFAULT_CONFIG_URL).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body = response.text().await.ok()?;
    // A captive portal or error page is not a config file
    body.lines()
        .any(|l| l.trim_start().starts_with("keep_build"))
        .then_some(body)
}
