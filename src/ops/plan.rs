//! Per-token install and removal decisions.
//!
//! Every install token walks the backends in priority order (repo, AUR,
//! then fallbacks) and ends in exactly one [`Classification`]. Accepted
//! packages are collected into a [`Plan`] so that each backend later runs a
//! single command.

use anyhow::Result;
use chrono::NaiveDate;

use crate::common::package::probe::app_id_from_rows;
use crate::common::package::{Backend, PackageName, PackageProbe, Plan, fuzzy};
use crate::common::prompt::{AnswerReader, Confirmer};
use crate::common::time::{format_date, humanize_age};
use crate::ui::prelude::*;

/// How many app store result rows are shown before asking.
const APP_STORE_PREVIEW_ROWS: usize = 5;

/// Where an install token ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Queued for a backend batch
    Batched {
        backend: Backend,
        package: PackageName,
    },
    /// Found on a backend, but the user said no
    Declined { backend: Backend },
    /// Not found, but a close installed package already covers it
    AlreadySatisfied { installed: String },
    /// Not found; a repo search offered something else
    SuggestedAlternative {
        suggestion: PackageName,
        accepted: bool,
    },
    NotFound,
}

/// Packages and apps confirmed for removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalPlan {
    pub packages: Vec<PackageName>,
    pub apps: Vec<PackageName>,
    /// Remove dependencies that nothing else needs (`-Rns`)
    pub prune_orphans: bool,
}

impl RemovalPlan {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.apps.is_empty()
    }
}

pub struct Planner<'a, R: AnswerReader> {
    probe: &'a dyn PackageProbe,
    confirmer: &'a mut Confirmer<R>,
    today: NaiveDate,
}

impl<'a, R: AnswerReader> Planner<'a, R> {
    pub fn new(probe: &'a dyn PackageProbe, confirmer: &'a mut Confirmer<R>, today: NaiveDate) -> Self {
        Self {
            probe,
            confirmer,
            today,
        }
    }

    /// Classify every token and batch the accepted packages.
    pub async fn plan_install(&mut self, tokens: &[String]) -> Result<Plan> {
        let mut plan = Plan::new();
        for token in tokens {
            match self.classify_install(token).await? {
                Classification::Batched { backend, package } => {
                    plan.push(backend, package);
                }
                Classification::SuggestedAlternative {
                    suggestion,
                    accepted: true,
                } => {
                    plan.push(Backend::Repo, suggestion);
                }
                _ => {}
            }
        }
        Ok(plan)
    }

    pub async fn classify_install(&mut self, token: &str) -> Result<Classification> {
        let Some(package) = usable_name(token) else {
            return Ok(Classification::NotFound);
        };

        if self.probe.exists_in_repo(&package) {
            return self.offer(package, Backend::Repo).await;
        }
        if self.probe.exists_in_aur(&package).await {
            return self.offer(package, Backend::Aur).await;
        }
        self.fallback(package).await
    }

    /// Apply the installed/outdated decision table for a matched backend.
    async fn offer(&mut self, package: PackageName, backend: Backend) -> Result<Classification> {
        let accepted = if self.probe.is_installed(&package) {
            if self.probe.is_outdated(&package) {
                self.confirmer.confirm(
                    &format!("Package \"{}\" already installed, but outdated. Update?", package),
                    true,
                )?
            } else {
                self.confirmer.confirm(
                    &format!("Package \"{}\" already installed. Reinstall?", package),
                    false,
                )?
            }
        } else {
            for (level, code, message) in self.install_notes(&package, backend).await {
                emit(level, code, &message, None);
            }
            let default_yes = backend != Backend::Aur;
            self.confirmer.confirm("", default_yes)?
        };

        Ok(if accepted {
            Classification::Batched { backend, package }
        } else {
            Classification::Declined { backend }
        })
    }

    /// What is shown before asking to install a package that isn't installed.
    async fn install_notes(
        &self,
        package: &PackageName,
        backend: Backend,
    ) -> Vec<(Level, &'static str, String)> {
        let mut notes = vec![match backend {
            Backend::Aur => (
                Level::Info,
                "plan.install.aur",
                format!(
                    "Package \"{}\" not found on pacman, but found on the AUR.",
                    package
                ),
            ),
            _ => (
                Level::Success,
                "plan.install.repo",
                format!("Installing package \"{}\" from {}", package, backend),
            ),
        }];
        if let Some(date) = self.probe.last_modified(package, backend).await {
            notes.push((
                Level::Info,
                "plan.install.last_updated",
                format!(
                    "Last updated: {} ({})",
                    format_date(date),
                    humanize_age(date, self.today)
                ),
            ));
        }
        notes
    }

    async fn fallback(&mut self, package: PackageName) -> Result<Classification> {
        let installed = self.probe.installed_packages();
        if let Some(hit) = fuzzy::best_match(package.as_str(), installed.iter().map(String::as_str))
            && self.probe.is_installed(&PackageName::sanitize(hit))
        {
            emit(
                Level::Warn,
                "plan.install.satisfied",
                &format!(
                    "Package \"{}\" not found, but \"{}\" is already installed.",
                    package, hit
                ),
                None,
            );
            return Ok(Classification::AlreadySatisfied {
                installed: hit.to_string(),
            });
        }

        if let Some(found) = self.probe.search_repo(&package) {
            let suggestion = PackageName::sanitize(&found);
            if !suggestion.is_empty() {
                emit(
                    Level::Warn,
                    "plan.install.suggestion",
                    &format!(
                        "Package \"{}\" not found. Did you mean \"{}\"?",
                        package, suggestion
                    ),
                    None,
                );
                let accepted = self
                    .confirmer
                    .confirm(&format!("Install \"{}\" instead?", suggestion), false)?;
                return Ok(Classification::SuggestedAlternative {
                    suggestion,
                    accepted,
                });
            }
        }

        emit(
            Level::Warn,
            "plan.install.not_found",
            &format!("Package \"{}\" not found on pacman or the AUR.", package),
            None,
        );
        if !self.confirmer.confirm("Search on Flatpak?", true)? {
            return Ok(Classification::NotFound);
        }
        self.search_app_store(package).await
    }

    async fn search_app_store(&mut self, package: PackageName) -> Result<Classification> {
        if !self.probe.app_store_available() {
            emit(
                Level::Warn,
                "plan.flatpak.missing",
                "Flatpak is not installed. Install it first with: rinse flatpak",
                None,
            );
            return Ok(Classification::NotFound);
        }

        if !self.probe.exists_in_app_store(&package) {
            return Ok(app_store_miss(&package));
        }
        let rows = self.probe.search_app_store(&package);
        let Some(app_id) = app_id_from_rows(&rows) else {
            return Ok(app_store_miss(&package));
        };

        emit(Level::Info, "plan.flatpak.found", "Found on Flatpak:", None);
        for row in rows.iter().take(APP_STORE_PREVIEW_ROWS) {
            emit(Level::Info, "plan.flatpak.row", row, None);
        }

        let prompt = format!("Install from Flatpak? (package id: {})", app_id);
        Ok(if self.confirmer.confirm(&prompt, true)? {
            Classification::Batched {
                backend: Backend::AppStore,
                package: app_id,
            }
        } else {
            Classification::Declined {
                backend: Backend::AppStore,
            }
        })
    }

    /// Resolve removal tokens and confirm the batch.
    ///
    /// Returns `None` when the user cancels the package removal.
    pub fn plan_removal(&mut self, tokens: &[String]) -> Result<Option<RemovalPlan>> {
        let mut plan = RemovalPlan::default();
        let installed = self.probe.installed_packages();

        for token in tokens {
            let Some(package) = usable_name(token) else {
                continue;
            };

            if self.probe.is_installed(&package) {
                push_unique(&mut plan.packages, package);
                continue;
            }

            if let Some(hit) =
                fuzzy::best_match(package.as_str(), installed.iter().map(String::as_str))
            {
                let hit = PackageName::sanitize(hit);
                emit(
                    Level::Warn,
                    "plan.remove.fuzzy",
                    &format!(
                        "Package \"{}\" is not installed, but a package called \"{}\" is.",
                        package, hit
                    ),
                    None,
                );
                if self
                    .confirmer
                    .confirm(&format!("Did you mean \"{}\"?", hit), true)?
                {
                    push_unique(&mut plan.packages, hit);
                }
                continue;
            }

            if let Some(app_id) = self.probe.installed_app_id(&package) {
                emit(
                    Level::Warn,
                    "plan.remove.flatpak",
                    &format!(
                        "Package \"{}\" was not found as a package on your pc, but was found as a flatpak app ({}).",
                        package, app_id
                    ),
                    None,
                );
                if self.confirmer.confirm(&format!("Remove {}?", package), true)? {
                    push_unique(&mut plan.apps, app_id);
                }
                continue;
            }

            emit(
                Level::Error,
                "plan.remove.not_installed",
                &format!("Package \"{}\" is not installed", package),
                None,
            );
        }

        if !plan.packages.is_empty() {
            let list = plan
                .packages
                .iter()
                .map(PackageName::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let plural = if plan.packages.len() > 1 { "s" } else { "" };
            if !self
                .confirmer
                .confirm(&format!("Remove package{} \"{}\"?", plural, list), true)?
            {
                return Ok(None);
            }
            if !self.probe.orphans().is_empty() {
                plan.prune_orphans = self.confirmer.confirm("Remove orphan dependencies?", true)?;
            }
        }

        Ok(Some(plan))
    }
}

/// Sanitize a token. Empty names and names that would read as options
/// (`-X`) are dropped with a warning.
fn usable_name(token: &str) -> Option<PackageName> {
    let package = PackageName::sanitize(token);
    if package.is_empty() || package.as_str().starts_with('-') {
        emit(
            Level::Warn,
            "plan.invalid_name",
            &format!("Ignoring invalid package name \"{}\"", token.trim()),
            None,
        );
        return None;
    }
    Some(package)
}

fn app_store_miss(package: &PackageName) -> Classification {
    emit(
        Level::Error,
        "plan.flatpak.not_found",
        &format!("Package \"{}\" not found on Flatpak either.", package),
        None,
    );
    emit(
        Level::Info,
        "plan.flatpak.local_hint",
        "If the package is a .tar.gz file you want to install, run \"rinse <path/to/file>\"",
        None,
    );
    Classification::NotFound
}

fn push_unique(list: &mut Vec<PackageName>, package: PackageName) {
    if !list.contains(&package) {
        list.push(package);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::package::probe::testing::FakeProbe;
    use crate::common::prompt::testing::{ScriptedReader, scripted};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn name(s: &str) -> PackageName {
        PackageName::sanitize(s)
    }

    async fn classify(
        probe: &FakeProbe,
        confirmer: &mut Confirmer<ScriptedReader>,
        token: &str,
    ) -> Classification {
        Planner::new(probe, confirmer, today())
            .classify_install(token)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fresh_repo_install_defaults_to_yes() {
        let probe = FakeProbe::new()
            .repo(&["htop"])
            .built_on("htop", NaiveDate::from_ymd_opt(2024, 12, 20).unwrap());
        let mut confirmer = scripted(&[""]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_install(&tokens(&["htop"]))
            .await
            .unwrap();
        assert_eq!(plan.batch(Backend::Repo), &[name("htop")]);
        assert_eq!(plan.package_count(), 1);
        assert_eq!(confirmer.reader().prompts, vec!["[Y/n]"]);
    }

    #[tokio::test]
    async fn install_notes_show_source_and_age() {
        let probe = FakeProbe::new()
            .repo(&["htop"])
            .built_on("htop", NaiveDate::from_ymd_opt(2024, 12, 20).unwrap());
        let mut confirmer = scripted(&[]);
        let planner = Planner::new(&probe, &mut confirmer, today());
        let notes: Vec<String> = planner
            .install_notes(&name("htop"), Backend::Repo)
            .await
            .into_iter()
            .map(|(_, _, message)| message)
            .collect();
        assert_eq!(
            notes,
            vec![
                "Installing package \"htop\" from pacman",
                "Last updated: 20 December 2024 (21 days ago)",
            ]
        );
    }

    #[tokio::test]
    async fn install_notes_skip_unknown_dates() {
        let probe = FakeProbe::new().aur(&["yay-bin"]);
        let mut confirmer = scripted(&[]);
        let planner = Planner::new(&probe, &mut confirmer, today());
        let notes = planner.install_notes(&name("yay-bin"), Backend::Aur).await;
        assert_eq!(notes.len(), 1);
        assert_eq!(
            notes[0].2,
            "Package \"yay-bin\" not found on pacman, but found on the AUR."
        );
    }

    #[tokio::test]
    async fn fresh_aur_install_defaults_to_no() {
        let probe = FakeProbe::new().aur(&["yay-bin"]);
        let mut confirmer = scripted(&[""]);
        let result = classify(&probe, &mut confirmer, "yay-bin").await;
        assert_eq!(result, Classification::Declined { backend: Backend::Aur });
        assert_eq!(confirmer.reader().prompts, vec!["[y/N]"]);
    }

    #[tokio::test]
    async fn outdated_package_is_updated_by_default() {
        let probe = FakeProbe::new()
            .repo(&["vim"])
            .installed(&["vim"])
            .outdated(&["vim"]);
        let mut confirmer = scripted(&[""]);
        let result = classify(&probe, &mut confirmer, "vim").await;
        assert_eq!(
            result,
            Classification::Batched {
                backend: Backend::Repo,
                package: name("vim")
            }
        );
        assert_eq!(
            confirmer.reader().prompts,
            vec!["Package \"vim\" already installed, but outdated. Update? [Y/n]"]
        );
    }

    #[tokio::test]
    async fn current_package_is_not_reinstalled_by_default() {
        let probe = FakeProbe::new().repo(&["vim"]).installed(&["vim"]);
        let mut confirmer = scripted(&[""]);
        let result = classify(&probe, &mut confirmer, "vim").await;
        assert_eq!(result, Classification::Declined { backend: Backend::Repo });
        assert_eq!(
            confirmer.reader().prompts,
            vec!["Package \"vim\" already installed. Reinstall? [y/N]"]
        );
    }

    #[tokio::test]
    async fn repo_wins_over_aur() {
        let probe = FakeProbe::new().repo(&["neovim"]).aur(&["neovim"]);
        let mut confirmer = scripted(&["y"]);
        let result = classify(&probe, &mut confirmer, "neovim").await;
        assert_eq!(
            result,
            Classification::Batched {
                backend: Backend::Repo,
                package: name("neovim")
            }
        );
    }

    #[tokio::test]
    async fn tokens_are_sanitized_before_batching() {
        let probe = FakeProbe::new().repo(&["htop"]);
        let mut confirmer = scripted(&[""]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_install(&tokens(&["htop;rm -rf /"]))
            .await
            .unwrap();
        // "htoprm-rf/" is not in the repo, so nothing unsanitized can slip through
        assert!(plan.batch(Backend::Repo).iter().all(|p| p.as_str() != "htop;rm -rf /"));

        let mut confirmer = scripted(&[""]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_install(&tokens(&["$(htop)"]))
            .await
            .unwrap();
        assert_eq!(plan.batch(Backend::Repo), &[name("htop")]);
    }

    #[tokio::test]
    async fn option_like_tokens_never_reach_a_backend() {
        let probe = FakeProbe::new().repo(&["htop", "-X"]);
        let mut confirmer = scripted(&[""]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_install(&tokens(&["-X", "htop"]))
            .await
            .unwrap();
        assert_eq!(plan.batch(Backend::Repo), &[name("htop")]);
        assert_eq!(confirmer.reader().prompts, vec!["[Y/n]"]);

        let probe = FakeProbe::new().installed(&["--noconfirm"]);
        let mut confirmer = scripted(&[]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_removal(&tokens(&["--noconfirm"]))
            .unwrap()
            .unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn installed_fuzzy_match_is_already_satisfied() {
        let probe = FakeProbe::new().installed(&["firefox", "htop"]);
        let mut confirmer = scripted(&[]);
        let result = classify(&probe, &mut confirmer, "fire").await;
        assert_eq!(
            result,
            Classification::AlreadySatisfied {
                installed: "firefox".to_string()
            }
        );
        assert!(confirmer.reader().prompts.is_empty());
    }

    #[tokio::test]
    async fn repo_suggestion_defaults_to_no() {
        let probe = FakeProbe::new().suggests("libreoffice", "libreoffice-fresh");
        let mut confirmer = scripted(&[""]);
        let result = classify(&probe, &mut confirmer, "libreoffice").await;
        assert_eq!(
            result,
            Classification::SuggestedAlternative {
                suggestion: name("libreoffice-fresh"),
                accepted: false
            }
        );
        assert_eq!(
            confirmer.reader().prompts,
            vec!["Install \"libreoffice-fresh\" instead? [y/N]"]
        );
    }

    #[tokio::test]
    async fn accepted_suggestion_joins_repo_batch() {
        let probe = FakeProbe::new().suggests("libreoffice", "libreoffice-fresh");
        let mut confirmer = scripted(&["y"]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_install(&tokens(&["libreoffice"]))
            .await
            .unwrap();
        assert_eq!(plan.batch(Backend::Repo), &[name("libreoffice-fresh")]);
    }

    #[tokio::test]
    async fn app_store_hit_uses_third_column_id() {
        let probe = FakeProbe::new().app_rows(&[
            "GIMP\tCreate images and edit photographs\torg.gimp.GIMP\t2.10.38\tstable\tflathub",
        ]);
        let mut confirmer = scripted(&["", ""]);
        let result = classify(&probe, &mut confirmer, "gimp").await;
        assert_eq!(
            result,
            Classification::Batched {
                backend: Backend::AppStore,
                package: name("org.gimp.GIMP")
            }
        );
        assert_eq!(
            confirmer.reader().prompts,
            vec![
                "Search on Flatpak? [Y/n]",
                "Install from Flatpak? (package id: org.gimp.GIMP) [Y/n]"
            ]
        );
    }

    #[tokio::test]
    async fn nothing_anywhere_is_not_found() {
        let probe = FakeProbe::new();
        let mut confirmer = scripted(&[""]);
        assert_eq!(
            classify(&probe, &mut confirmer, "nonexistent").await,
            Classification::NotFound
        );

        let probe = FakeProbe::new().without_app_store();
        let mut confirmer = scripted(&[""]);
        assert_eq!(
            classify(&probe, &mut confirmer, "nonexistent").await,
            Classification::NotFound
        );

        let mut confirmer = scripted(&["n"]);
        assert_eq!(
            classify(&FakeProbe::new(), &mut confirmer, "nonexistent").await,
            Classification::NotFound
        );
    }

    #[tokio::test]
    async fn literal_yes_confirms_the_rest_of_the_run() {
        let probe = FakeProbe::new().aur(&["a", "b", "c"]);
        let mut confirmer = scripted(&["yes"]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_install(&tokens(&["a", "b", "c"]))
            .await
            .unwrap();
        assert_eq!(plan.batch(Backend::Aur), &[name("a"), name("b"), name("c")]);
        assert_eq!(confirmer.reader().prompts.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_tokens_are_batched_once() {
        let probe = FakeProbe::new().repo(&["htop"]);
        let mut confirmer = scripted(&["y", "y"]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_install(&tokens(&["htop", "htop"]))
            .await
            .unwrap();
        assert_eq!(plan.batch(Backend::Repo), &[name("htop")]);
    }

    #[test]
    fn removal_uses_the_fuzzy_matched_name() {
        let probe = FakeProbe::new().installed(&["neofetch", "htop"]);
        let mut confirmer = scripted(&["", ""]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_removal(&tokens(&["neofetc"]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.packages, vec![name("neofetch")]);
        assert!(!plan.prune_orphans);
        assert_eq!(
            confirmer.reader().prompts,
            vec![
                "Did you mean \"neofetch\"? [Y/n]",
                "Remove package \"neofetch\"? [Y/n]"
            ]
        );
    }

    #[test]
    fn removal_asks_about_orphans_only_when_present() {
        let probe = FakeProbe::new()
            .installed(&["vim", "htop"])
            .orphans(&["libfoo"]);
        let mut confirmer = scripted(&["", ""]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_removal(&tokens(&["vim", "htop"]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.packages, vec![name("vim"), name("htop")]);
        assert!(plan.prune_orphans);
        assert_eq!(
            confirmer.reader().prompts,
            vec![
                "Remove packages \"vim, htop\"? [Y/n]",
                "Remove orphan dependencies? [Y/n]"
            ]
        );
    }

    #[test]
    fn declining_the_batch_cancels_removal() {
        let probe = FakeProbe::new().installed(&["vim"]);
        let mut confirmer = scripted(&["n"]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_removal(&tokens(&["vim"]))
            .unwrap();
        assert_eq!(plan, None);
    }

    #[test]
    fn removal_falls_back_to_installed_apps() {
        let probe = FakeProbe::new().installed_apps(&["com.discordapp.Discord"]);
        let mut confirmer = scripted(&[""]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_removal(&tokens(&["discord"]))
            .unwrap()
            .unwrap();
        assert!(plan.packages.is_empty());
        assert_eq!(plan.apps, vec![name("com.discordapp.Discord")]);
        assert_eq!(confirmer.reader().prompts, vec!["Remove discord? [Y/n]"]);
    }

    #[test]
    fn unknown_removal_is_skipped() {
        let probe = FakeProbe::new().installed(&["vim"]);
        let mut confirmer = scripted(&[]);
        let plan = Planner::new(&probe, &mut confirmer, today())
            .plan_removal(&tokens(&["steam"]))
            .unwrap()
            .unwrap();
        assert!(plan.is_empty());
    }
}
