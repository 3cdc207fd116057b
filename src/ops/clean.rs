use anyhow::Result;

use super::Session;
use crate::common::package::{PackageName, commands};
use crate::common::prompt::AnswerReader;
use crate::ui::prelude::*;

/// Clear the package caches and offer to drop orphaned dependencies.
pub async fn clean_caches<R: AnswerReader>(session: &mut Session<'_, R>) -> Result<()> {
    emit(Level::Info, "clean.cache", "Cleaning package cache...", None);
    let mut succeeded = session
        .run(&commands::pacman_clean_cache(), "Cleaning")
        .await?
        .is_success();

    if let Some(helper) = session.probe.aur_helper() {
        emit(Level::Info, "clean.aur", "Cleaning AUR cache...", None);
        succeeded &= session
            .run(&commands::aur_clean_cache(helper), "Cleaning")
            .await?
            .is_success();
    }

    let orphans: Vec<PackageName> = session
        .probe
        .orphans()
        .iter()
        .map(|name| PackageName::sanitize(name))
        .filter(|name| !name.is_empty())
        .collect();

    if orphans.is_empty() {
        emit(
            Level::Success,
            "clean.no_orphans",
            "No orphan packages found",
            None,
        );
    } else if session.confirm("Remove orphan packages?", true)? {
        emit(
            Level::Info,
            "clean.orphans",
            "Removing orphan packages...",
            None,
        );
        succeeded &= session
            .run(&commands::pacman_remove(&orphans, true), "Removing")
            .await?
            .is_success();
    }

    session.finish("clean", "Cache cleanup", succeeded, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::package::probe::testing::FakeProbe;
    use crate::context::RunContext;
    use crate::exec::Outcome;
    use crate::ops::testing::{session, session_with_outcomes};

    #[tokio::test]
    async fn cleans_caches_and_orphans() {
        let ctx = RunContext::default();
        let probe = FakeProbe::new().orphans(&["libfoo", "python-bar"]);
        let (mut session, runner) = session(&ctx, &probe, &[""]);
        clean_caches(&mut session).await.unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "sudo pacman -Sc --noconfirm",
                "yay -Sc --noconfirm",
                "sudo pacman -Rns --noconfirm libfoo python-bar",
            ]
        );
    }

    #[tokio::test]
    async fn no_orphans_no_prompt() {
        let ctx = RunContext::default();
        let probe = FakeProbe::new().without_helper();
        let (mut session, runner) = session(&ctx, &probe, &[]);
        clean_caches(&mut session).await.unwrap();
        assert_eq!(runner.commands(), vec!["sudo pacman -Sc --noconfirm"]);
    }

    #[tokio::test]
    async fn failed_cache_clean_still_offers_orphans() {
        let ctx = RunContext::default();
        let probe = FakeProbe::new().orphans(&["libfoo"]).without_helper();
        let (mut session, runner) =
            session_with_outcomes(&ctx, &probe, &["n"], &[Outcome::Failed(Some(1))]);
        clean_caches(&mut session).await.unwrap();
        assert_eq!(runner.commands(), vec!["sudo pacman -Sc --noconfirm"]);
        assert_eq!(
            session.confirmer.reader().prompts,
            vec!["Remove orphan packages? [Y/n]"]
        );
    }
}
