use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// An isolated config home for one test run.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    /// Same as `new`, with a config file in place so nothing is downloaded.
    pub fn with_config(contents: &str) -> Result<Self> {
        let env = Self::new()?;
        let dir = env.rinse_dir();
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("rinse.conf"), contents)?;
        Ok(env)
    }

    pub fn config_home(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn rinse_dir(&self) -> PathBuf {
        self.config_home().join("rinse")
    }

    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(env!("CARGO_BIN_EXE_rinse"))
            .args(args)
            .env("XDG_CONFIG_HOME", self.config_home())
            .env("NO_COLOR", "1")
            .env_remove("RUST_BACKTRACE")
            .output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
