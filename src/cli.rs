//! Command line parsing.
//!
//! rinse mixes pacman-style operations (`-S`, `-Syu`, `-Qs`) with plain
//! words, and flags may appear anywhere. Flag words are pulled out first and
//! parsed by clap; whatever remains decides the [`Action`].

use clap::Parser;
use colored::Colorize;

use crate::error::RinseError;

#[derive(Parser, Debug, Default)]
#[command(
    name = "rinse",
    version,
    about = "Fast CLI frontend for pacman, the AUR and Flatpak",
    disable_help_flag = true
)]
pub struct Flags {
    /// Auto-confirm all prompts
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Show what would be done without doing it
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Keep build files after installing from a source archive
    #[arg(short = 'k', long = "keep")]
    pub keep: bool,

    /// Show complete command output instead of a progress bar
    #[arg(long = "full-log")]
    pub full_log: bool,

    /// Time threshold for `rinse outdated` (5d, 3m, 2y)
    #[arg(long, value_name = "VALUE")]
    pub time: Option<String>,

    /// Print debug information
    #[arg(long)]
    pub debug: bool,

    /// Emit one JSON event per line
    #[arg(long)]
    pub json: bool,

    #[arg(short = 'h', long = "help")]
    pub help: bool,
}

/// What the user asked rinse to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Help,
    Install(Vec<String>),
    Remove(Vec<String>),
    /// `refresh` forces a database refresh (`-Syyu`)
    Update { refresh: bool },
    Lookup(Vec<String>),
    Clean,
    Outdated,
    LocalFile(String),
}

#[derive(Debug)]
pub struct Invocation {
    pub flags: Flags,
    pub words: Vec<String>,
}

const HELP_WORDS: &[&str] = &["-h", "--help", "-help", "--h", "help"];
const DRY_WORDS: &[&str] = &["dry"];
/// Letters of the short flags that can be bundled, as in `-yn`.
const BUNDLED_SHORTS: &str = "ynk";

fn is_flag_word(word: &str) -> bool {
    if let Some(long) = word.strip_prefix("--") {
        return matches!(
            long.split('=').next().unwrap_or(""),
            "yes" | "dry-run" | "keep" | "full-log" | "time" | "debug" | "json" | "version"
        );
    }
    if word == "-V" {
        return true;
    }
    match word.strip_prefix('-') {
        Some(shorts) if !shorts.is_empty() => shorts.chars().all(|c| BUNDLED_SHORTS.contains(c)),
        _ => false,
    }
}

/// Separate flag words from operation words.
pub fn split_args<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut flags = Vec::new();
    let mut words = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if HELP_WORDS.contains(&arg.as_str()) {
            flags.push("--help".to_string());
        } else if DRY_WORDS.contains(&arg.as_str()) {
            flags.push("--dry-run".to_string());
        } else if arg == "--time" {
            flags.push(arg);
            if let Some(value) = args.next() {
                flags.push(value);
            }
        } else if is_flag_word(&arg) {
            flags.push(arg);
        } else {
            words.push(arg);
        }
    }
    (flags, words)
}

/// Parse the full argv, program name included.
pub fn parse<I>(argv: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = String>,
{
    let mut argv = argv.into_iter();
    let program = argv.next().unwrap_or_else(|| "rinse".to_string());
    let (flag_words, words) = split_args(argv);
    let flags = Flags::try_parse_from(std::iter::once(program).chain(flag_words))?;
    Ok(Invocation { flags, words })
}

/// Decide the action from the non-flag words.
///
/// `is_file` tells whether a word names a file on disk; a leading file
/// argument means a local install.
pub fn classify(words: &[String], is_file: impl Fn(&str) -> bool) -> Result<Action, RinseError> {
    let Some((first, rest)) = words.split_first() else {
        return Ok(Action::Help);
    };
    let rest = rest.to_vec();

    let action = match first.as_str() {
        "install" | "-S" => Action::Install(rest),
        "remove" | "uninstall" | "rem" | "-R" | "-Rs" | "-Rns" => Action::Remove(rest),
        "update" | "upgrade" | "new" | "-Syu" => Action::Update { refresh: false },
        "-Syyu" => Action::Update { refresh: true },
        "lookup" | "check" | "list" | "search" | "-Q" | "-Qs" => Action::Lookup(rest),
        "clean" | "-Sc" => Action::Clean,
        "outdated" => Action::Outdated,
        word if word.starts_with('-') && rest.is_empty() => {
            return Err(RinseError::UnrecognizedCommand(word.to_string()));
        }
        word if is_file(word) => Action::LocalFile(word.to_string()),
        _ => Action::Install(words.to_vec()),
    };
    Ok(action)
}

pub fn help_text() -> String {
    let section = |title: &str| format!("{}", title.bold());
    let lines = [
        format!("{} - Fast CLI frontend for pacman, the AUR and Flatpak", "rinse".bold()),
        format!("{}", format!("Version {}", env!("CARGO_PKG_VERSION")).cyan()),
        String::new(),
        section("USAGE:"),
        "  rinse <package>...           Install one or more packages".into(),
        "  rinse <command> [options]    Run a specific command".into(),
        String::new(),
        section("INSTALL COMMANDS:"),
        "  rinse <pkg>...               Install packages from pacman, the AUR or Flatpak".into(),
        "  rinse install <pkg>...       Same as above (explicit)".into(),
        "  rinse -S <pkg>...            pacman-style install".into(),
        "  rinse <file>                 Install from a .pkg.tar.zst or .tar.gz file".into(),
        String::new(),
        section("PACKAGE MANAGEMENT:"),
        "  rinse update                 Update all packages (pacman + AUR)".into(),
        "  rinse upgrade, rinse new     Aliases for update".into(),
        "  rinse -Syu                   pacman-style update".into(),
        "  rinse -Syyu                  Force database refresh + update".into(),
        "  rinse remove <pkg>...        Remove one or more packages".into(),
        "  rinse uninstall, rem, -R     Aliases for remove".into(),
        "  rinse -Rs <pkg>...           Remove with dependencies".into(),
        "  rinse clean, -Sc             Clean package cache and remove orphans".into(),
        "  rinse outdated               Show packages not updated recently".into(),
        String::new(),
        section("QUERY COMMANDS:"),
        "  rinse lookup [term]...       List or search installed packages".into(),
        "  rinse check, list, search    Aliases for lookup".into(),
        "  rinse -Q, -Qs [term]...      pacman-style query".into(),
        String::new(),
        section("FLAGS:"),
        "  --dry-run, -n, dry           Show what would be done without doing it".into(),
        "  -y, --yes                    Auto-confirm all prompts".into(),
        "  -k, --keep                   Keep build files after a source install".into(),
        "  --time <value>               Threshold for outdated: 5d, 3m, 2y".into(),
        "  --full-log                   Show complete command output".into(),
        "  --debug                      Print debug information".into(),
        "  --json                       Emit machine-readable events".into(),
        "  -h, --help, help             Show this help message".into(),
        String::new(),
        section("TIPS:"),
        "  Type 'yes' at any prompt to auto-confirm the remaining ones".into(),
        "  Config file: ~/.config/rinse/rinse.conf".into(),
        format!("  Source and issues: {}", "https://github.com/Rousevv/rinse".cyan()),
    ];
    lines.join("\n")
}
