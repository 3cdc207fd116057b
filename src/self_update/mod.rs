//! Keeping rinse itself current.
//!
//! After a system update, the head revision of the configured branch is
//! compared with the marker written by the last update. A newer revision
//! schedules the install script to run detached, and the process exits so
//! the binary can be replaced underneath it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use duct::cmd;

use crate::common::paths;
use crate::common::prompt::{AnswerReader, Confirmer};
use crate::common::sanitize::{SanitizeContext, sanitize};
use crate::exec::CommandSpec;
use crate::ui::prelude::*;

const REPO_URL: &str = "https://github.com/Rousevv/rinse";
const RAW_BASE_URL: &str = "https://raw.githubusercontent.com/rousevv/rinse";
const SHORT_REV_LEN: usize = 7;

/// Where the latest published revision comes from.
pub trait RevisionSource {
    /// Full hash of the branch head, or `None` when unreachable.
    fn latest_revision(&self, branch: &str) -> Option<String>;
}

/// Lists the remote's refs without cloning anything.
pub struct GitRemote {
    url: String,
}

impl GitRemote {
    pub fn new() -> Self {
        Self {
            url: REPO_URL.to_string(),
        }
    }
}

impl Default for GitRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionSource for GitRemote {
    fn latest_revision(&self, branch: &str) -> Option<String> {
        let mut remote = git2::Remote::create_detached(self.url.as_str()).ok()?;
        remote.connect(git2::Direction::Fetch).ok()?;
        let wanted = format!("refs/heads/{}", branch);
        let head = remote
            .list()
            .ok()?
            .iter()
            .find(|head| head.name() == wanted)
            .map(|head| head.oid().to_string());
        head
    }
}

/// What the caller must do once the update check returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Continue,
    /// Exit with status 0 right away; a detached script replaces the binary
    Exit,
}

/// The detached install script, ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledUpdate {
    pub revision: String,
    pub command: CommandSpec,
}

impl ScheduledUpdate {
    fn new(revision: String, branch: &str) -> Self {
        Self {
            revision,
            command: CommandSpec::new("sh").arg("-c").arg(update_script(branch)),
        }
    }

    /// Start the script. It backgrounds itself, so this returns at once.
    pub fn launch(&self) -> Result<()> {
        cmd(&self.command.program, &self.command.args)
            .stdin_null()
            .stdout_null()
            .stderr_null()
            .unchecked()
            .run()
            .context("starting update script")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    Unreachable,
    UpToDate,
    Declined,
    Scheduled(ScheduledUpdate),
}

fn short(rev: &str) -> &str {
    let end = rev
        .char_indices()
        .nth(SHORT_REV_LEN)
        .map_or(rev.len(), |(i, _)| i);
    &rev[..end]
}

/// Shell line that fetches and runs the install script after a short delay.
pub fn update_script(branch: &str) -> String {
    let branch: String = sanitize(branch, SanitizeContext::Config)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!(
        "(sleep 0.5; curl -sSL {}/{}/install.sh | bash >/dev/null 2>&1; notify-send 'rinse' 'Update complete' 2>/dev/null) &",
        RAW_BASE_URL, branch
    )
}

pub struct SelfUpdater<S: RevisionSource> {
    source: S,
    marker: PathBuf,
    branch: String,
}

impl SelfUpdater<GitRemote> {
    pub fn for_branch(branch: &str) -> Result<Self> {
        Ok(Self::new(GitRemote::new(), paths::version_marker_file()?, branch))
    }
}

impl<S: RevisionSource> SelfUpdater<S> {
    pub fn new(source: S, marker: PathBuf, branch: &str) -> Self {
        Self {
            source,
            marker,
            branch: branch.to_string(),
        }
    }

    /// Compare the remote head with the marker and offer the update.
    ///
    /// A newer revision is written to the marker before asking, so a
    /// declined update is not offered again until the branch moves.
    pub fn check<R: AnswerReader>(&self, confirmer: &mut Confirmer<R>) -> Result<UpdateCheck> {
        let Some(remote) = self.source.latest_revision(&self.branch) else {
            return Ok(UpdateCheck::Unreachable);
        };

        let local = read_marker(&self.marker);
        if local.as_deref().map(short) == Some(short(&remote)) {
            return Ok(UpdateCheck::UpToDate);
        }

        write_marker(&self.marker, &remote)?;

        let prompt = format!("rinse update available ({}). Install?", short(&remote));
        if !confirmer.confirm(&prompt, true)? {
            return Ok(UpdateCheck::Declined);
        }
        Ok(UpdateCheck::Scheduled(ScheduledUpdate::new(
            remote,
            &self.branch,
        )))
    }
}

fn read_marker(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let rev = contents.trim();
    (!rev.is_empty()).then(|| rev.to_string())
}

fn write_marker(path: &Path, rev: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", rev))
        .with_context(|| format!("writing version marker {}", path.display()))
}

/// Run the update check and act on it.
pub fn run<S: RevisionSource, R: AnswerReader>(
    updater: &SelfUpdater<S>,
    confirmer: &mut Confirmer<R>,
    dry_run: bool,
) -> Result<Termination> {
    emit(
        Level::Info,
        "self_update.check",
        "Checking for rinse updates...",
        None,
    );

    match updater.check(confirmer)? {
        UpdateCheck::Unreachable => {
            emit(
                Level::Warn,
                "self_update.unreachable",
                "Could not check for updates",
                None,
            );
            Ok(Termination::Continue)
        }
        UpdateCheck::UpToDate => {
            emit(
                Level::Success,
                "self_update.up_to_date",
                "✓ rinse is up to date",
                None,
            );
            Ok(Termination::Continue)
        }
        UpdateCheck::Declined => Ok(Termination::Continue),
        UpdateCheck::Scheduled(update) => {
            if dry_run {
                emit(
                    Level::Info,
                    "self_update.dry_run",
                    &format!("[DRY RUN] Would execute: {}", update.command.display()),
                    None,
                );
                return Ok(Termination::Continue);
            }
            emit(
                Level::Info,
                "self_update.start",
                "Starting update in background...",
                None,
            );
            emit(
                Level::Warn,
                "self_update.exit",
                "rinse will exit now. The update will complete shortly.",
                None,
            );
            update.launch()?;
            emit(Level::Success, "self_update.launched", "✓ Update initiated", None);
            Ok(Termination::Exit)
        }
    }
}
