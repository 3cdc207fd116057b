use anyhow::Result;

use super::Session;
use crate::common::package::commands;
use crate::common::prompt::AnswerReader;
use crate::self_update::{self, SelfUpdater, Termination};
use crate::ui::prelude::*;

/// Upgrade repo and AUR packages, then check for a newer rinse.
pub async fn update_system<R: AnswerReader>(session: &mut Session<'_, R>) -> Result<Termination> {
    let pending = session.probe.outdated_packages();
    if pending.is_empty() {
        emit(
            Level::Success,
            "update.up_to_date",
            "✓ System is up to date",
            None,
        );
        return check_self_update(session);
    }

    let plural = if pending.len() == 1 { "" } else { "s" };
    emit(
        Level::Warn,
        "update.pending",
        &format!("Found {} outdated package{}", pending.len(), plural),
        Some(serde_json::json!({ "packages": pending })),
    );
    if !session.confirm("Update all?", true)? {
        return Ok(Termination::Continue);
    }

    emit(
        Level::Info,
        "update.repo",
        "Updating official packages...",
        None,
    );
    let mut succeeded = session
        .run(&commands::pacman_upgrade(session.ctx.refresh), "Updating")
        .await?
        .is_success();

    if let Some(helper) = session.probe.aur_helper() {
        emit(Level::Info, "update.aur", "Updating AUR packages...", None);
        succeeded &= session
            .run(&commands::aur_upgrade(helper), "Updating")
            .await?
            .is_success();
    }

    session.finish("update", "Update", succeeded, Some("System update complete"));

    check_self_update(session)
}

fn check_self_update<R: AnswerReader>(session: &mut Session<'_, R>) -> Result<Termination> {
    if !session.ctx.config.auto_update {
        return Ok(Termination::Continue);
    }
    // Only an installed rinse can be replaced by the install script
    if which::which("rinse").is_err() {
        emit(
            Level::Debug,
            "update.self.not_installed",
            "rinse is not on PATH, skipping self-update",
            None,
        );
        return Ok(Termination::Continue);
    }
    let updater = SelfUpdater::for_branch(&session.ctx.config.update_branch)?;
    self_update::run(&updater, &mut session.confirmer, session.ctx.dry_run)
}
