//! Package sources and the names that flow between them.
//!
//! # Architecture
//!
//! - [`Backend`]: the three package sources, in lookup priority order
//! - [`PackageName`]: a sanitized package name, the only form probes and
//!   commands accept
//! - [`Plan`]: per-backend batches built while classifying tokens
//! - [`PackageProbe`]: installed / outdated / available queries
//! - [`commands`]: the backend command lines for each batch

pub mod commands;
pub mod fuzzy;
mod plan;
pub mod probe;

pub use plan::Plan;
pub use probe::{PackageProbe, SystemProbe};

use std::fmt;

use crate::common::sanitize::{SanitizeContext, sanitize};

/// A package source, ordered by lookup and execution priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    /// Official repositories through pacman
    Repo,
    /// Arch User Repository through an AUR helper
    Aur,
    /// Flathub through flatpak
    AppStore,
}

impl Backend {
    /// Get a human-readable name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Repo => "pacman",
            Self::Aur => "AUR",
            Self::AppStore => "Flatpak",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A package name or app id that has been through the sanitizer.
///
/// Construct it once per token with [`PackageName::sanitize`]; everything
/// downstream takes the sanitized value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName(String);

impl PackageName {
    pub fn sanitize(raw: &str) -> Self {
        Self(sanitize(raw.trim(), SanitizeContext::Package))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Detect available AUR helper (yay, paru, etc.)
///
/// Returns the name of the first available AUR helper found.
pub fn detect_aur_helper() -> Option<&'static str> {
    const AUR_HELPERS: &[&str] = &["yay", "paru", "pikaur", "trizen"];

    AUR_HELPERS
        .iter()
        .find(|&helper| which::which(helper).is_ok())
        .copied()
}
