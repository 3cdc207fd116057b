//! Queries against pacman, the AUR and Flatpak.
//!
//! Probing is advisory: a failed or empty external call reads as "no",
//! "nothing" or "unknown", never as an error.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use duct::cmd;
use serde::Deserialize;
use tokio::runtime::RuntimeFlavor;

use super::{Backend, PackageName, detect_aur_helper};
use crate::common::time::{date_from_timestamp, parse_build_date};
use crate::ui::prelude::*;

const AUR_RPC_URL: &str = "https://aur.archlinux.org/rpc/?v=5&type=info&arg=";
const AUR_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait PackageProbe: Send + Sync {
    fn is_installed(&self, pkg: &PackageName) -> bool;
    fn is_outdated(&self, pkg: &PackageName) -> bool {
        self.outdated_packages().iter().any(|p| p == pkg.as_str())
    }
    fn exists_in_repo(&self, pkg: &PackageName) -> bool;
    async fn exists_in_aur(&self, pkg: &PackageName) -> bool;
    fn exists_in_app_store(&self, pkg: &PackageName) -> bool {
        !self.search_app_store(pkg).is_empty()
    }
    async fn last_modified(&self, pkg: &PackageName, backend: Backend) -> Option<NaiveDate>;

    /// Names of all installed packages, in pacman's order.
    fn installed_packages(&self) -> Vec<String>;
    /// Best repo search hit for a name that doesn't exist as-is.
    fn search_repo(&self, pkg: &PackageName) -> Option<String>;
    /// Result rows of an app store search.
    fn search_app_store(&self, pkg: &PackageName) -> Vec<String>;
    /// Id of an installed app whose id contains `pkg`.
    fn installed_app_id(&self, pkg: &PackageName) -> Option<PackageName>;
    /// Packages no longer required by anything.
    fn orphans(&self) -> Vec<String>;
    /// Upgradable packages.
    fn outdated_packages(&self) -> Vec<String>;
    fn app_store_available(&self) -> bool;
    fn aur_helper(&self) -> Option<&'static str>;
}

/// Probe backed by the real package tools.
pub struct SystemProbe {
    client: Option<reqwest::Client>,
}

impl SystemProbe {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("rinse/{}", env!("CARGO_PKG_VERSION")))
            .timeout(AUR_TIMEOUT)
            .build()
            .ok();
        Self { client }
    }

    /// Raw `name version` lines of `pacman -Q`.
    pub fn installed_lines(&self) -> Vec<String> {
        read(&["-Q"])
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Build dates of many packages from a single `pacman -Si` call.
    pub fn repo_build_dates(&self, names: &[String]) -> Vec<(String, Option<NaiveDate>)> {
        if names.is_empty() {
            return Vec::new();
        }
        let mut args = vec!["-Si"];
        args.extend(names.iter().map(String::as_str));
        // Packages missing from the sync db make pacman exit non-zero; the rest is still printed
        let output = blocking(|| {
            cmd("pacman", &args)
                .env("LC_ALL", "C")
                .stderr_null()
                .unchecked()
                .read()
                .unwrap_or_default()
        });
        parse_info_blocks(&output)
    }

    async fn aur_info(&self, pkg: &PackageName) -> Option<AurResponse> {
        let client = self.client.as_ref()?;
        let url = format!("{}{}", AUR_RPC_URL, urlencoding::encode(pkg.as_str()));
        let response = client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let info = response.json::<AurResponse>().await.ok();
        emit(
            Level::Debug,
            "probe.aur",
            &format!("AUR lookup for {}: {:?}", pkg, info),
            None,
        );
        info
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct AurResponse {
    resultcount: u32,
    #[serde(default)]
    results: Vec<AurPackage>,
}

#[derive(Debug, Deserialize)]
struct AurPackage {
    #[serde(rename = "LastModified")]
    last_modified: Option<i64>,
}

/// Run a blocking query from async code.
///
/// On a multi-threaded runtime the worker hands its other tasks off first.
/// Elsewhere `f` simply runs in place.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Run pacman quietly; `None` when it fails.
fn read(args: &[&str]) -> Option<String> {
    blocking(|| {
        cmd("pacman", args)
            .env("LC_ALL", "C")
            .stderr_null()
            .read()
            .ok()
    })
}

fn succeeds(program: &str, args: &[&str]) -> bool {
    blocking(|| {
        cmd(program, args)
            .stdout_null()
            .stderr_null()
            .unchecked()
            .run()
            .map(|out| out.status.success())
            .unwrap_or(false)
    })
}

#[async_trait]
impl PackageProbe for SystemProbe {
    fn is_installed(&self, pkg: &PackageName) -> bool {
        !pkg.is_empty() && succeeds("pacman", &["-Q", pkg.as_str()])
    }

    fn exists_in_repo(&self, pkg: &PackageName) -> bool {
        !pkg.is_empty() && succeeds("pacman", &["-Si", pkg.as_str()])
    }

    async fn exists_in_aur(&self, pkg: &PackageName) -> bool {
        if pkg.is_empty() {
            return false;
        }
        self.aur_info(pkg)
            .await
            .is_some_and(|info| info.resultcount == 1)
    }

    async fn last_modified(&self, pkg: &PackageName, backend: Backend) -> Option<NaiveDate> {
        match backend {
            Backend::Repo => {
                let output = read(&["-Si", pkg.as_str()])?;
                build_date_from_info(&output)
            }
            Backend::Aur => {
                let info = self.aur_info(pkg).await?;
                let stamp = info.results.first()?.last_modified?;
                date_from_timestamp(stamp)
            }
            Backend::AppStore => None,
        }
    }

    fn installed_packages(&self) -> Vec<String> {
        first_column(&read(&["-Q"]).unwrap_or_default())
    }

    fn search_repo(&self, pkg: &PackageName) -> Option<String> {
        if pkg.is_empty() {
            return None;
        }
        let pattern = format!("^{}", regex::escape(pkg.as_str()));
        let output = read(&["-Ss", &pattern])?;
        suggestion_from_search(&output)
    }

    fn search_app_store(&self, pkg: &PackageName) -> Vec<String> {
        if pkg.is_empty() || !self.app_store_available() {
            return Vec::new();
        }
        blocking(|| {
            cmd!("flatpak", "search", pkg.as_str())
                .stderr_null()
                .unchecked()
                .read()
                .map(|out| app_store_rows(&out))
                .unwrap_or_default()
        })
    }

    fn installed_app_id(&self, pkg: &PackageName) -> Option<PackageName> {
        if pkg.is_empty() || !self.app_store_available() {
            return None;
        }
        let output = blocking(|| {
            cmd!("flatpak", "list", "--app", "--columns=application")
                .stderr_null()
                .read()
                .ok()
        })?;
        matching_app_id(&output, pkg)
    }

    fn orphans(&self) -> Vec<String> {
        // pacman -Qtdq exits 1 when there are none
        read(&["-Qtdq"])
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn outdated_packages(&self) -> Vec<String> {
        first_column(&read(&["-Qu"]).unwrap_or_default())
    }

    fn app_store_available(&self) -> bool {
        which::which("flatpak").is_ok()
    }

    fn aur_helper(&self) -> Option<&'static str> {
        detect_aur_helper()
    }
}

/// First whitespace-separated column of each non-empty line.
pub(crate) fn first_column(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Value of a `Key : value` field in `pacman -Si`/`-Qi` output.
fn info_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = line.split_once(':')?;
    (k.trim() == key).then(|| v.trim())
}

pub(crate) fn build_date_from_info(output: &str) -> Option<NaiveDate> {
    output
        .lines()
        .find_map(|line| info_field(line, "Build Date"))
        .and_then(parse_build_date)
}

/// Split multi-package `pacman -Si` output into (name, build date) pairs.
pub(crate) fn parse_info_blocks(output: &str) -> Vec<(String, Option<NaiveDate>)> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, Option<NaiveDate>)> = None;
    for line in output.lines() {
        if let Some(name) = info_field(line, "Name") {
            if let Some(done) = current.take() {
                blocks.push(done);
            }
            current = Some((name.to_string(), None));
        } else if let Some(date) = info_field(line, "Build Date")
            && let Some((_, slot)) = current.as_mut()
        {
            *slot = parse_build_date(date);
        }
    }
    blocks.extend(current);
    blocks
}

/// Package name from the first hit of `pacman -Ss`, without its repo prefix.
pub(crate) fn suggestion_from_search(output: &str) -> Option<String> {
    let first = output.lines().find(|l| !l.trim().is_empty())?;
    let qualified = first.split_whitespace().next()?;
    let name = qualified.rsplit_once('/').map_or(qualified, |(_, n)| n);
    (!name.is_empty()).then(|| name.to_string())
}

/// Result rows of `flatpak search`, without header or "No matches" lines.
pub(crate) fn app_store_rows(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter(|l| !l.contains("No matches"))
        .filter(|l| !is_header_row(l))
        .map(str::to_string)
        .collect()
}

fn is_header_row(line: &str) -> bool {
    let mut cols = split_columns(line);
    cols.next() == Some("Name") && cols.next() == Some("Description")
}

fn split_columns(line: &str) -> Box<dyn Iterator<Item = &str> + '_> {
    if line.contains('\t') {
        Box::new(line.split('\t').map(str::trim))
    } else {
        Box::new(line.split_whitespace())
    }
}

/// Application id (third column) of the first real search row.
pub fn app_id_from_rows(rows: &[String]) -> Option<PackageName> {
    let row = rows.iter().find(|r| !is_header_row(r))?;
    let id = PackageName::sanitize(split_columns(row).nth(2)?);
    (!id.is_empty()).then_some(id)
}

fn matching_app_id(list_output: &str, pkg: &PackageName) -> Option<PackageName> {
    let needle = pkg.as_str().to_lowercase();
    list_output
        .lines()
        .map(str::trim)
        .find(|id| !id.is_empty() && id.to_lowercase().contains(&needle))
        .map(PackageName::sanitize)
}
