//! Backend command lines.

use std::path::Path;

use super::PackageName;
use crate::exec::CommandSpec;

pub const FLATHUB_REMOTE: &str = "flathub";
pub const YAY_AUR_URL: &str = "https://aur.archlinux.org/yay.git";

fn names(packages: &[PackageName]) -> impl Iterator<Item = String> + '_ {
    packages.iter().map(|p| p.as_str().to_string())
}

/// `sudo pacman -S --noconfirm <pkgs>`
pub fn pacman_install(packages: &[PackageName]) -> CommandSpec {
    CommandSpec::new("sudo")
        .args(["pacman", "-S", "--noconfirm"])
        .args(names(packages))
}

/// `<helper> -S --noconfirm <pkgs>`
pub fn aur_install(helper: &str, packages: &[PackageName]) -> CommandSpec {
    CommandSpec::new(helper)
        .args(["-S", "--noconfirm"])
        .args(names(packages))
}

/// `flatpak install -y flathub <id> --system`
pub fn flatpak_install(app_id: &PackageName) -> CommandSpec {
    CommandSpec::new("flatpak")
        .args(["install", "-y", FLATHUB_REMOTE])
        .arg(app_id.as_str())
        .arg("--system")
}

/// `flatpak uninstall -y <id>`
pub fn flatpak_uninstall(app_id: &PackageName) -> CommandSpec {
    CommandSpec::new("flatpak")
        .args(["uninstall", "-y"])
        .arg(app_id.as_str())
}

/// `sudo pacman -R --noconfirm <pkgs>`, or `-Rns` to take orphans along
pub fn pacman_remove(packages: &[PackageName], prune_orphans: bool) -> CommandSpec {
    let op = if prune_orphans { "-Rns" } else { "-R" };
    CommandSpec::new("sudo")
        .args(["pacman", op, "--noconfirm"])
        .args(names(packages))
}

/// `sudo pacman -Syu --noconfirm` (`-Syyu` forces a database refresh)
pub fn pacman_upgrade(force_refresh: bool) -> CommandSpec {
    let op = if force_refresh { "-Syyu" } else { "-Syu" };
    CommandSpec::new("sudo").args(["pacman", op, "--noconfirm"])
}

/// `<helper> -Syu --noconfirm`
pub fn aur_upgrade(helper: &str) -> CommandSpec {
    CommandSpec::new(helper).args(["-Syu", "--noconfirm"])
}

/// `sudo pacman -Sc --noconfirm`
pub fn pacman_clean_cache() -> CommandSpec {
    CommandSpec::new("sudo").args(["pacman", "-Sc", "--noconfirm"])
}

/// `<helper> -Sc --noconfirm`
pub fn aur_clean_cache(helper: &str) -> CommandSpec {
    CommandSpec::new(helper).args(["-Sc", "--noconfirm"])
}

/// `sudo pacman -U --noconfirm <file>`
pub fn pacman_install_file(path: &Path) -> CommandSpec {
    CommandSpec::new("sudo")
        .args(["pacman", "-U", "--noconfirm"])
        .arg(path.to_string_lossy())
}

/// The two steps that build and install yay from the AUR inside `workdir`.
pub fn yay_bootstrap(workdir: &Path) -> [CommandSpec; 2] {
    let checkout = workdir.join("yay");
    [
        CommandSpec::new("git")
            .args(["clone", YAY_AUR_URL])
            .arg(checkout.to_string_lossy())
            .current_dir(workdir),
        CommandSpec::new("makepkg")
            .args(["-si", "--noconfirm"])
            .current_dir(checkout)
            .elevated(),
    ]
}
