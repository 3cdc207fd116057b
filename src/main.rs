mod cli;
mod common;
mod context;
mod error;
mod exec;
mod ops;
mod self_update;
mod ui;

use anyhow::Result;
use sudo::RunningAs;

use crate::cli::{Action, Invocation};
use crate::common::config::Config;
use crate::common::package::SystemProbe;
use crate::common::prompt::Confirmer;
use crate::context::RunContext;
use crate::error::RinseError;
use crate::ops::{Session, clean, install, local, query, remove, update};
use crate::self_update::Termination;
use crate::ui::prelude::*;

#[tokio::main]
async fn main() {
    let invocation = match cli::parse(std::env::args()) {
        Ok(invocation) => invocation,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let format = if invocation.flags.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, format == OutputFormat::Text && ui::color_supported());
    ui::set_debug_mode(invocation.flags.debug);

    match run(invocation).await {
        Ok(Termination::Continue) => {}
        Ok(Termination::Exit) => std::process::exit(0),
        Err(e) => {
            let code = e
                .downcast_ref::<RinseError>()
                .map_or(1, RinseError::exit_code);
            emit(Level::Error, "error", &format!("Error: {:#}", e), None);
            std::process::exit(code);
        }
    }
}

async fn run(invocation: Invocation) -> Result<Termination> {
    let Invocation { flags, words } = invocation;

    if flags.help {
        println!("{}", cli::help_text());
        return Ok(Termination::Continue);
    }

    let action = cli::classify(&words, local::is_local_file)?;
    if action == Action::Help {
        println!("{}", cli::help_text());
        return Ok(Termination::Continue);
    }

    if matches!(sudo::check(), RunningAs::Root) {
        emit(
            Level::Warn,
            "root.warning",
            "Warning: rinse isn't meant to be run as sudo! Continuing anyway...",
            None,
        );
    }

    let config = Config::load().await?;
    emit(
        Level::Debug,
        "config.loaded",
        &format!("Loaded config: {:?}", config),
        None,
    );

    let ctx = RunContext {
        dry_run: flags.dry_run,
        full_log: flags.full_log,
        keep: flags.keep,
        refresh: matches!(action, Action::Update { refresh: true }),
        time_override: flags.time.clone(),
        config,
    };
    let probe = SystemProbe::new();
    let mut session = Session::new(
        &ctx,
        &probe,
        Confirmer::terminal(flags.yes),
        ctx.executor(),
    );

    match action {
        Action::Help => {}
        Action::Install(tokens) => install::install_packages(&mut session, &tokens).await?,
        Action::Remove(tokens) => remove::remove_packages(&mut session, &tokens).await?,
        Action::Update { .. } => return update::update_system(&mut session).await,
        Action::Lookup(terms) => query::lookup(&probe, &terms)?,
        Action::Clean => clean::clean_caches(&mut session).await?,
        Action::Outdated => query::outdated(&ctx, &probe)?,
        Action::LocalFile(path) => local::install_local_file(&mut session, &path).await?,
    }
    Ok(Termination::Continue)
}
