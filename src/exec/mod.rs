//! Running backend commands.
//!
//! Commands are described by a [`CommandSpec`] (program plus argument
//! vector) and never pass through a shell. The [`Executor`] decides how a
//! command runs: previewed in dry-run mode, streamed in full-log mode, or
//! silently on a worker task while a progress bar is redrawn.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use duct::cmd;
use tokio::sync::oneshot;

use crate::ui::prelude::*;
use crate::ui::progress::{ProgressDisplay, REDRAW_INTERVAL, estimate_percent};

/// A program and its arguments, run without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Calls sudo itself (e.g. `makepkg -si`)
    pub elevated: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            elevated: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    /// Whether running this command will ask for a sudo password.
    pub fn needs_elevation(&self) -> bool {
        self.elevated || self.program == "sudo"
    }

    /// Render as a copy-pasteable command line.
    pub fn display(&self) -> String {
        let line = shell_words::join(std::iter::once(&self.program).chain(self.args.iter()));
        match &self.cwd {
            Some(dir) => format!(
                "(cd {} && {})",
                shell_words::quote(&dir.to_string_lossy()),
                line
            ),
            None => line,
        }
    }
}

/// What happened to a command handed to the [`Executor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Non-zero exit, or `None` when the process could not be started
    Failed(Option<i32>),
    /// Dry-run: printed, not executed
    Previewed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded | Outcome::Previewed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Output discarded
    Silent,
    /// Output goes to the terminal
    Visible,
}

/// Runs a command to completion and reports its exit.
pub trait CommandRunner: Send + Sync + 'static {
    fn run(&self, spec: &CommandSpec, output: OutputMode) -> Outcome;
}

/// Runs commands through duct.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, output: OutputMode) -> Outcome {
        let mut expr = cmd(&spec.program, &spec.args).unchecked();
        if let Some(dir) = &spec.cwd {
            expr = expr.dir(dir);
        }
        if output == OutputMode::Silent {
            expr = expr.stdout_null().stderr_null().stdin_null();
        }
        match expr.run() {
            Ok(out) if out.status.success() => Outcome::Succeeded,
            Ok(out) => Outcome::Failed(out.status.code()),
            Err(e) => {
                emit(
                    Level::Debug,
                    "exec.spawn_failed",
                    &format!("Could not start {}: {}", spec.program, e),
                    None,
                );
                Outcome::Failed(None)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    DryRun,
    FullLog,
    Progress,
}

impl ExecMode {
    pub fn from_flags(dry_run: bool, full_log: bool) -> Self {
        if dry_run {
            ExecMode::DryRun
        } else if full_log {
            ExecMode::FullLog
        } else {
            ExecMode::Progress
        }
    }
}

pub struct Executor {
    mode: ExecMode,
    runner: Arc<dyn CommandRunner>,
}

impl Executor {
    pub fn new(mode: ExecMode) -> Self {
        Self::with_runner(mode, Arc::new(SystemRunner))
    }

    pub fn with_runner(mode: ExecMode, runner: Arc<dyn CommandRunner>) -> Self {
        Self { mode, runner }
    }

    pub fn is_dry_run(&self) -> bool {
        self.mode == ExecMode::DryRun
    }

    /// Run `spec`, labelled `label` on the progress bar.
    pub async fn run(&self, spec: &CommandSpec, label: &str) -> Result<Outcome> {
        emit(
            Level::Debug,
            "exec.command",
            &format!("{}: {}", label, spec.display()),
            None,
        );

        match self.mode {
            ExecMode::DryRun => {
                println!("{} {}", "[DRY RUN] Would execute:".yellow(), spec.display());
                Ok(Outcome::Previewed)
            }
            ExecMode::FullLog => {
                let outcome = self.run_blocking(spec.clone(), OutputMode::Visible).await?;
                if !outcome.is_success() {
                    emit(Level::Error, "exec.failed", "✗ Operation failed", None);
                }
                Ok(outcome)
            }
            ExecMode::Progress => self.run_with_progress(spec, label).await,
        }
    }

    async fn run_with_progress(&self, spec: &CommandSpec, label: &str) -> Result<Outcome> {
        // Authenticate up front so the password prompt doesn't land inside the bar
        if spec.needs_elevation() {
            let auth = CommandSpec::new("sudo").arg("-v");
            self.run_blocking(auth, OutputMode::Visible).await?;
        }

        let (tx, mut rx) = oneshot::channel();
        let runner = Arc::clone(&self.runner);
        let worker_spec = spec.clone();
        let worker = tokio::task::spawn_blocking(move || {
            let outcome = runner.run(&worker_spec, OutputMode::Silent);
            let _ = tx.send(outcome);
        });

        let display = ProgressDisplay::new(label);
        let start = Instant::now();
        let mut ticker = tokio::time::interval(REDRAW_INTERVAL);

        let finished = loop {
            tokio::select! {
                result = &mut rx => break result.ok(),
                _ = ticker.tick() => display.draw(estimate_percent(start.elapsed())),
            }
        };
        worker.await.context("command worker panicked")?;

        let outcome = finished.unwrap_or(Outcome::Failed(None));
        if outcome.is_success() {
            display.finish_success();
            return Ok(outcome);
        }

        display.finish_failed();
        emit(
            Level::Error,
            "exec.rerun",
            "Running with output for debugging:",
            None,
        );
        self.run_blocking(spec.clone(), OutputMode::Visible).await?;
        Ok(outcome)
    }

    async fn run_blocking(&self, spec: CommandSpec, output: OutputMode) -> Result<Outcome> {
        let runner = Arc::clone(&self.runner);
        tokio::task::spawn_blocking(move || runner.run(&spec, output))
            .await
            .context("command worker panicked")
    }
}
