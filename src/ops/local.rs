//! Installing from a file on disk: prebuilt packages or source tarballs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use super::Session;
use crate::common::package::commands;
use crate::common::paths;
use crate::common::prompt::AnswerReader;
use crate::common::sanitize::{SanitizeContext, sanitize};
use crate::exec::CommandSpec;
use crate::ui::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// A pacman package (`.pkg.tar.*`, `.zst`)
    Package,
    /// A source tarball to build (`.tar.gz`)
    Source,
    Unsupported,
}

impl ArchiveKind {
    pub fn detect(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.contains(".pkg.tar") || name.ends_with(".zst") {
            ArchiveKind::Package
        } else if name.ends_with(".tar.gz") {
            ArchiveKind::Source
        } else {
            ArchiveKind::Unsupported
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSystem {
    CMake,
    Autotools,
    Make,
    None,
}

impl BuildSystem {
    pub fn detect(source: &Path) -> Self {
        if source.join("CMakeLists.txt").exists() {
            BuildSystem::CMake
        } else if source.join("configure").exists() {
            BuildSystem::Autotools
        } else if source.join("Makefile").exists() || source.join("makefile").exists() {
            BuildSystem::Make
        } else {
            BuildSystem::None
        }
    }

    fn label(self) -> &'static str {
        match self {
            BuildSystem::CMake => "CMake",
            BuildSystem::Autotools => "autotools",
            BuildSystem::Make => "Makefile",
            BuildSystem::None => "no",
        }
    }
}

/// Build commands and the final install command for a detected project.
pub fn build_steps(
    system: BuildSystem,
    source: &Path,
    jobs: usize,
) -> (Vec<CommandSpec>, CommandSpec) {
    let make = |dir: &Path| CommandSpec::new("make").arg(format!("-j{}", jobs)).current_dir(dir);
    let make_install = |dir: &Path| {
        CommandSpec::new("sudo")
            .args(["make", "install"])
            .current_dir(dir)
    };

    match system {
        BuildSystem::CMake => {
            let build = source.join("build");
            (
                vec![
                    CommandSpec::new("cmake")
                        .args(["-S", ".", "-B", "build"])
                        .current_dir(source),
                    make(build.as_path()),
                ],
                make_install(build.as_path()),
            )
        }
        BuildSystem::Autotools => (
            vec![
                CommandSpec::new(source.join("configure").to_string_lossy()).current_dir(source),
                make(source),
            ],
            make_install(source),
        ),
        BuildSystem::Make => (vec![make(source)], make_install(source)),
        BuildSystem::None => (Vec::new(), make_install(source)),
    }
}

/// Directory name derived from the archive, e.g. `foo-1.2` for `foo-1.2.tar.gz`.
pub fn archive_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file.strip_suffix(".tar.gz").unwrap_or(&file);
    sanitize(stem, SanitizeContext::Path).replace(['/', ' '], "")
}

/// The project root inside an extracted archive.
///
/// Tarballs usually wrap everything in one top-level directory; use it when
/// it is the only entry.
pub fn source_root(extracted: &Path) -> PathBuf {
    let entries: Vec<_> = WalkDir::new(extracted)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .collect();
    match entries.as_slice() {
        [only] if only.file_type().is_dir() => only.path().to_path_buf(),
        _ => extracted.to_path_buf(),
    }
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Whether `raw` names an existing file to install from.
pub fn is_local_file(raw: &str) -> bool {
    expand(raw).is_file()
}

pub async fn install_local_file<R: AnswerReader>(
    session: &mut Session<'_, R>,
    raw: &str,
) -> Result<()> {
    let path = expand(raw);
    if !path.exists() {
        emit(
            Level::Error,
            "local.missing",
            &format!("File not found: {}", raw),
            None,
        );
        return Ok(());
    }
    let path = std::path::absolute(&path)
        .with_context(|| format!("resolving {}", path.display()))?;

    let kind = ArchiveKind::detect(&path);
    if kind == ArchiveKind::Unsupported {
        emit(
            Level::Error,
            "local.unsupported",
            "Unsupported file type",
            None,
        );
        return Ok(());
    }

    if !session.confirm(&format!("Installing from {}", path.display()), true)? {
        return Ok(());
    }

    match kind {
        ArchiveKind::Package => {
            let outcome = session
                .run(&commands::pacman_install_file(&path), "Installing")
                .await?;
            session.finish("local", "Installation", outcome.is_success(), None);
            Ok(())
        }
        ArchiveKind::Source => build_from_source(session, &path).await,
        ArchiveKind::Unsupported => Ok(()),
    }
}

async fn build_from_source<R: AnswerReader>(
    session: &mut Session<'_, R>,
    archive: &Path,
) -> Result<()> {
    let name = archive_name(archive);
    if name.is_empty() {
        emit(
            Level::Error,
            "local.bad_name",
            &format!("Cannot derive a project name from {}", archive.display()),
            None,
        );
        return Ok(());
    }
    let build_dir = paths::build_dir(&name);

    if session.executor.is_dry_run() {
        emit(
            Level::Info,
            "local.dry_run",
            &format!("[DRY RUN] Would extract and build from {}", archive.display()),
            None,
        );
        return Ok(());
    }

    emit(
        Level::Info,
        "local.extract",
        "Extracting source archive...",
        None,
    );
    fs::create_dir_all(&build_dir)
        .with_context(|| format!("creating build directory {}", build_dir.display()))?;
    let extract = CommandSpec::new("tar")
        .arg("-xzf")
        .arg(archive.to_string_lossy())
        .arg("-C")
        .arg(build_dir.to_string_lossy());
    if !session.run(&extract, "Extracting").await?.is_success() {
        emit(
            Level::Error,
            "local.extract_failed",
            "✗ Failed to extract archive",
            None,
        );
        cleanup(session, &build_dir);
        return Ok(());
    }

    let source = source_root(&build_dir);
    let system = BuildSystem::detect(&source);
    let jobs = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    if system == BuildSystem::None {
        install_to_opt(session, &source, &name).await?;
    } else {
        emit(Level::Info, "local.build", "Building from source...", None);
        emit(
            Level::Warn,
            "local.build.note",
            "Note: This may take a while. Use --full-log to see build output.",
            None,
        );
        emit(
            Level::Info,
            "local.build.detected",
            &format!("Detected {} project", system.label()),
            None,
        );

        let (steps, install) = build_steps(system, &source, jobs);
        let mut built = true;
        for step in &steps {
            if !session.run(step, "Building").await?.is_success() {
                built = false;
                break;
            }
        }

        if built {
            emit(
                Level::Info,
                "local.install",
                "Installing built files...",
                None,
            );
            if session.run(&install, "Installing").await?.is_success() {
                session.finish("local", "Installation", true, None);
            } else {
                emit(
                    Level::Warn,
                    "local.install_failed",
                    "Build succeeded but install failed",
                    None,
                );
            }
        } else {
            emit(Level::Error, "local.build_failed", "✗ Build failed", None);
            emit(
                Level::Error,
                "local.build_failed.hint",
                &format!(
                    "Try --full-log or build manually in: {}",
                    source.display()
                ),
                None,
            );
        }
    }

    cleanup(session, &build_dir);
    Ok(())
}

async fn install_to_opt<R: AnswerReader>(
    session: &mut Session<'_, R>,
    source: &Path,
    name: &str,
) -> Result<()> {
    let dest = Path::new("/opt").join(name);
    emit(
        Level::Warn,
        "local.no_build_system",
        &format!("No build system detected. Extracting to {}", dest.display()),
        None,
    );
    let mkdir = CommandSpec::new("sudo")
        .args(["mkdir", "-p"])
        .arg(dest.to_string_lossy());
    // "SRC/." copies the directory contents, hidden files included
    let copy = CommandSpec::new("sudo")
        .args(["cp", "-r"])
        .arg(format!("{}/.", source.display()))
        .arg(dest.to_string_lossy());

    if session.run(&mkdir, "Installing").await?.is_success()
        && session.run(&copy, "Installing").await?.is_success()
    {
        emit(
            Level::Success,
            "local.extracted",
            &format!("✓ Extracted to {}", dest.display()),
            None,
        );
    }
    Ok(())
}

fn cleanup<R: AnswerReader>(session: &Session<'_, R>, build_dir: &Path) {
    if session.ctx.keep_build() {
        emit(
            Level::Info,
            "local.kept",
            &format!("Build files kept in: {}", build_dir.display()),
            None,
        );
        return;
    }
    if let Err(e) = fs::remove_dir_all(build_dir) {
        emit(
            Level::Debug,
            "local.cleanup_failed",
            &format!("Could not remove {}: {}", build_dir.display(), e),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::package::probe::testing::FakeProbe;
    use crate::context::RunContext;
    use crate::ops::testing::session;

    #[test]
    fn detects_archive_kinds() {
        assert_eq!(
            ArchiveKind::detect(Path::new("/tmp/htop-3.3.0-4-x86_64.pkg.tar.zst")),
            ArchiveKind::Package
        );
        assert_eq!(
            ArchiveKind::detect(Path::new("foo.pkg.tar.xz")),
            ArchiveKind::Package
        );
        assert_eq!(
            ArchiveKind::detect(Path::new("foo-1.2.tar.gz")),
            ArchiveKind::Source
        );
        assert_eq!(
            ArchiveKind::detect(Path::new("notes.txt")),
            ArchiveKind::Unsupported
        );
    }

    #[test]
    fn archive_name_strips_suffix_and_unsafe_chars() {
        assert_eq!(archive_name(Path::new("/home/me/foo-1.2.tar.gz")), "foo-1.2");
        assert_eq!(archive_name(Path::new("bad$(name).tar.gz")), "badname");
    }

    #[test]
    fn detects_build_systems() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(BuildSystem::detect(dir.path()), BuildSystem::None);
        fs::write(dir.path().join("Makefile"), "").unwrap();
        assert_eq!(BuildSystem::detect(dir.path()), BuildSystem::Make);
        fs::write(dir.path().join("configure"), "").unwrap();
        assert_eq!(BuildSystem::detect(dir.path()), BuildSystem::Autotools);
        fs::write(dir.path().join("CMakeLists.txt"), "").unwrap();
        assert_eq!(BuildSystem::detect(dir.path()), BuildSystem::CMake);
    }

    #[test]
    fn cmake_builds_out_of_tree() {
        let (steps, install) = build_steps(BuildSystem::CMake, Path::new("/tmp/src"), 8);
        let shown: Vec<_> = steps.iter().map(CommandSpec::display).collect();
        assert_eq!(
            shown,
            vec![
                "(cd /tmp/src && cmake -S . -B build)",
                "(cd /tmp/src/build && make -j8)"
            ]
        );
        assert_eq!(install.display(), "(cd /tmp/src/build && sudo make install)");
    }

    #[test]
    fn source_root_descends_into_single_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("foo-1.2")).unwrap();
        assert_eq!(source_root(dir.path()), dir.path().join("foo-1.2"));
        fs::write(dir.path().join("README"), "").unwrap();
        assert_eq!(source_root(dir.path()), dir.path().to_path_buf());
    }

    #[tokio::test]
    async fn package_file_goes_to_pacman() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("htop-3.3.0-4-x86_64.pkg.tar.zst");
        fs::write(&file, "").unwrap();

        let ctx = RunContext::default();
        let probe = FakeProbe::new();
        let (mut session, runner) = session(&ctx, &probe, &[""]);
        install_local_file(&mut session, &file.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(
            runner.commands(),
            vec![format!("sudo pacman -U --noconfirm {}", file.display())]
        );
    }

    #[tokio::test]
    async fn unsupported_file_is_not_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "").unwrap();

        let ctx = RunContext::default();
        let probe = FakeProbe::new();
        let (mut session, runner) = session(&ctx, &probe, &[]);
        install_local_file(&mut session, &file.to_string_lossy())
            .await
            .unwrap();
        assert!(runner.calls().is_empty());
        assert!(session.confirmer.reader().prompts.is_empty());
    }

    #[tokio::test]
    async fn plain_tarball_is_copied_to_opt_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!("rinse-plain-{}", std::process::id());
        let file = dir.path().join(format!("{}.tar.gz", name));
        fs::write(&file, "").unwrap();

        let ctx = RunContext::default();
        let probe = FakeProbe::new();
        let (mut session, runner) = session(&ctx, &probe, &[""]);
        install_local_file(&mut session, &file.to_string_lossy())
            .await
            .unwrap();

        let build_dir = paths::build_dir(&name);
        let commands = runner.commands();
        assert_eq!(commands.len(), 3);
        assert!(commands[0].starts_with("tar -xzf"));
        assert_eq!(commands[1], format!("sudo mkdir -p /opt/{}", name));
        assert_eq!(
            commands[2],
            format!("sudo cp -r {}/. /opt/{}", build_dir.display(), name)
        );
        assert!(!build_dir.exists());
    }
}
