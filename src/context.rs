//! Per-invocation settings shared by every operation.

use crate::common::config::Config;
use crate::common::notify::DesktopNotifier;
use crate::exec::{ExecMode, Executor};

/// Flags and config for one run. Built once in `main` and never mutated.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub dry_run: bool,
    pub full_log: bool,
    /// Keep source build directories (`-k`)
    pub keep: bool,
    /// Force a database refresh on update (`-Syyu`)
    pub refresh: bool,
    /// `--time` value for `rinse outdated`
    pub time_override: Option<String>,
    pub config: Config,
}

impl RunContext {
    pub fn exec_mode(&self) -> ExecMode {
        ExecMode::from_flags(self.dry_run, self.full_log)
    }

    pub fn executor(&self) -> Executor {
        Executor::new(self.exec_mode())
    }

    pub fn keep_build(&self) -> bool {
        self.keep || self.config.keep_build
    }

    /// Threshold for `rinse outdated`, preferring `--time`.
    pub fn outdated_time(&self) -> &str {
        self.time_override
            .as_deref()
            .unwrap_or(&self.config.outdated_time)
    }

    /// Desktop notifier, silent in dry-run mode.
    pub fn notifier(&self) -> DesktopNotifier {
        DesktopNotifier::new(self.config.notify && !self.dry_run)
    }
}
