use anyhow::Result;

use super::Session;
use super::plan::Planner;
use crate::common::package::{Backend, PackageName, commands};
use crate::common::prompt::AnswerReader;
use crate::common::time;
use crate::error::RinseError;
use crate::exec::CommandSpec;
use crate::ui::prelude::*;

/// Plan the tokens, then install each backend batch in priority order.
pub async fn install_packages<R: AnswerReader>(
    session: &mut Session<'_, R>,
    tokens: &[String],
) -> Result<()> {
    if tokens.is_empty() {
        return Err(RinseError::MissingArgument("install").into());
    }

    let plan = Planner::new(session.probe, &mut session.confirmer, time::today())
        .plan_install(tokens)
        .await?;
    if plan.is_empty() {
        return Ok(());
    }
    emit(
        Level::Debug,
        "install.plan",
        &format!("{} package(s) queued", plan.package_count()),
        None,
    );

    let mut succeeded = true;
    for (backend, batch) in plan.batches() {
        succeeded &= match backend {
            Backend::Repo => {
                emit(
                    Level::Info,
                    "install.repo",
                    "Installing from official repos...",
                    None,
                );
                session
                    .run(&commands::pacman_install(batch), "Installing")
                    .await?
                    .is_success()
            }
            Backend::Aur => {
                let helper = ensure_aur_helper(session).await?;
                emit(Level::Info, "install.aur", "Installing from AUR...", None);
                session
                    .run(&commands::aur_install(helper, batch), "Installing")
                    .await?
                    .is_success()
            }
            Backend::AppStore => install_apps(session, batch).await?,
        };
    }

    session.finish(
        "install",
        "Installation",
        succeeded,
        Some("Package installation complete"),
    );
    Ok(())
}

/// Find an AUR helper, offering to build yay when there is none.
async fn ensure_aur_helper<R: AnswerReader>(session: &mut Session<'_, R>) -> Result<&'static str> {
    if let Some(helper) = session.probe.aur_helper() {
        return Ok(helper);
    }

    if !session.confirm("yay (AUR frontend) not found. Install?", true)? {
        return Err(RinseError::AurHelperUnavailable.into());
    }

    if session.executor.is_dry_run() {
        emit(
            Level::Info,
            "install.yay.dry_run",
            "[DRY RUN] Would install yay",
            None,
        );
        return Ok("yay");
    }

    emit(Level::Info, "install.yay", "Installing yay...", None);
    let workdir = tempfile::Builder::new().prefix("rinse-yay").tempdir()?;
    for step in commands::yay_bootstrap(workdir.path()) {
        if !session.run(&step, "Installing yay").await?.is_success() {
            return Err(RinseError::AurHelperUnavailable.into());
        }
    }
    Ok("yay")
}

/// Install app store ids one by one. `false` when any of them failed.
async fn install_apps<R: AnswerReader>(
    session: &mut Session<'_, R>,
    apps: &[PackageName],
) -> Result<bool> {
    if !session.probe.app_store_available() {
        emit(
            Level::Warn,
            "install.flatpak.missing",
            "Flatpak is not installed. Installing flatpak first...",
            None,
        );
        if !session.confirm("Install flatpak?", true)? {
            emit(
                Level::Error,
                "install.flatpak.declined",
                "Cannot install Flatpak packages without flatpak",
                None,
            );
            return Ok(false);
        }
        let flatpak = CommandSpec::new("sudo").args(["pacman", "-S", "--noconfirm", "flatpak"]);
        if !session.run(&flatpak, "Installing").await?.is_success() {
            return Ok(false);
        }
    }

    emit(
        Level::Info,
        "install.flatpak",
        "Installing from Flatpak...",
        None,
    );
    let mut succeeded = true;
    for app in apps {
        succeeded &= session
            .run(&commands::flatpak_install(app), "Installing")
            .await?
            .is_success();
    }
    Ok(succeeded)
}
