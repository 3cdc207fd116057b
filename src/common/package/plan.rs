//! Batched package actions.
//!
//! Packages are grouped by backend so each backend gets a single command,
//! reducing prompts and sudo invocations.

use std::collections::BTreeMap;

use super::{Backend, PackageName};

/// Packages to act on, grouped by backend in insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    batches: BTreeMap<Backend, Vec<PackageName>>,
}

impl Plan {
    /// Create a new empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package to a backend's batch.
    ///
    /// Returns `false` if the package was already queued for that backend.
    pub fn push(&mut self, backend: Backend, package: PackageName) -> bool {
        let batch = self.batches.entry(backend).or_default();
        if batch.contains(&package) {
            return false;
        }
        batch.push(package);
        true
    }

    pub fn batch(&self, backend: Backend) -> &[PackageName] {
        self.batches.get(&backend).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty batches in backend priority order.
    pub fn batches(&self) -> impl Iterator<Item = (Backend, &[PackageName])> {
        self.batches
            .iter()
            .filter(|(_, pkgs)| !pkgs.is_empty())
            .map(|(backend, pkgs)| (*backend, pkgs.as_slice()))
    }

    /// Check if there are any packages to act on.
    pub fn is_empty(&self) -> bool {
        self.batches.values().all(|v| v.is_empty())
    }

    /// Get the total number of queued packages.
    pub fn package_count(&self) -> usize {
        self.batches.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PackageName {
        PackageName::sanitize(s)
    }

    #[test]
    fn keeps_insertion_order_within_backend() {
        let mut plan = Plan::new();
        plan.push(Backend::Repo, name("vim"));
        plan.push(Backend::Repo, name("htop"));
        plan.push(Backend::Repo, name("btop"));
        assert_eq!(plan.batch(Backend::Repo), &[name("vim"), name("htop"), name("btop")]);
    }

    #[test]
    fn rejects_duplicates_in_same_batch() {
        let mut plan = Plan::new();
        assert!(plan.push(Backend::Aur, name("yay-bin")));
        assert!(!plan.push(Backend::Aur, name("yay-bin")));
        assert!(plan.push(Backend::Repo, name("yay-bin")));
        assert_eq!(plan.package_count(), 2);
    }

    #[test]
    fn batches_come_out_in_priority_order() {
        let mut plan = Plan::new();
        plan.push(Backend::AppStore, name("org.gimp.GIMP"));
        plan.push(Backend::Repo, name("htop"));
        let order: Vec<_> = plan.batches().map(|(b, _)| b).collect();
        assert_eq!(order, vec![Backend::Repo, Backend::AppStore]);
        assert!(plan.batch(Backend::Aur).is_empty());
    }

    #[test]
    fn empty_plan() {
        let plan = Plan::new();
        assert!(plan.is_empty());
        assert_eq!(plan.batches().count(), 0);
    }
}
