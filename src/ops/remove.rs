use anyhow::Result;

use super::Session;
use super::plan::Planner;
use crate::common::package::commands;
use crate::common::prompt::AnswerReader;
use crate::common::time;
use crate::error::RinseError;
use crate::ui::prelude::*;

pub async fn remove_packages<R: AnswerReader>(
    session: &mut Session<'_, R>,
    tokens: &[String],
) -> Result<()> {
    if tokens.is_empty() {
        return Err(RinseError::MissingArgument("remove").into());
    }

    let Some(plan) =
        Planner::new(session.probe, &mut session.confirmer, time::today()).plan_removal(tokens)?
    else {
        return Ok(());
    };
    if plan.is_empty() {
        return Ok(());
    }

    let mut succeeded = true;
    if !plan.packages.is_empty() {
        succeeded &= session
            .run(
                &commands::pacman_remove(&plan.packages, plan.prune_orphans),
                "Removing",
            )
            .await?
            .is_success();
    }

    if !plan.apps.is_empty() {
        emit(
            Level::Info,
            "remove.flatpak",
            "Removing Flatpak apps...",
            None,
        );
        for app in &plan.apps {
            succeeded &= session
                .run(&commands::flatpak_uninstall(app), "Removing")
                .await?
                .is_success();
        }
    }

    session.finish(
        "remove",
        "Removal",
        succeeded,
        Some("Package removal complete"),
    );
    Ok(())
}
