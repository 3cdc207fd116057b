//! User-facing operations.
//!
//! Each operation takes a [`Session`]: the run context plus the probe,
//! confirmer, executor and notifier it talks to. Tests build sessions from
//! fakes.

pub mod clean;
pub mod install;
pub mod local;
pub mod plan;
pub mod query;
pub mod remove;
pub mod update;

use std::sync::Arc;

use crate::common::notify::Notifier;
use crate::common::package::PackageProbe;
use crate::common::prompt::{AnswerReader, Confirmer, TerminalReader};
use crate::context::RunContext;
use crate::exec::{CommandSpec, Executor, Outcome};
use crate::ui::prelude::*;

pub struct Session<'a, R: AnswerReader = TerminalReader> {
    pub ctx: &'a RunContext,
    pub probe: &'a dyn PackageProbe,
    pub confirmer: Confirmer<R>,
    pub executor: Executor,
    notifier: Arc<dyn Notifier>,
}

impl<'a, R: AnswerReader> Session<'a, R> {
    pub fn new(
        ctx: &'a RunContext,
        probe: &'a dyn PackageProbe,
        confirmer: Confirmer<R>,
        executor: Executor,
    ) -> Self {
        Self {
            ctx,
            probe,
            confirmer,
            executor,
            notifier: Arc::new(ctx.notifier()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn confirm(&mut self, prompt: &str, default_yes: bool) -> anyhow::Result<bool> {
        self.confirmer.confirm(prompt, default_yes)
    }

    pub async fn run(&self, spec: &CommandSpec, label: &str) -> anyhow::Result<Outcome> {
        self.executor.run(spec, label).await
    }

    /// Close an operation that ran commands.
    ///
    /// `✓ <what> complete` and the notification only go out when every
    /// command succeeded. Failures are reported, never turned into an exit
    /// status.
    pub fn finish(&self, code: &str, what: &str, succeeded: bool, notification: Option<&str>) {
        if !succeeded {
            emit(
                Level::Error,
                &format!("{}.failed", code),
                &format!("✗ {} finished with errors", what),
                None,
            );
            return;
        }
        emit(
            Level::Success,
            &format!("{}.complete", code),
            &format!("✓ {} complete", what),
            None,
        );
        if let Some(message) = notification {
            self.notifier.notify(message);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::common::package::probe::testing::FakeProbe;
    use crate::common::prompt::testing::{ScriptedReader, scripted};
    use crate::exec::ExecMode;
    use crate::exec::testing::RecordingRunner;

    /// A session over fakes that records commands and notifications instead
    /// of running or sending them. Every command succeeds.
    pub fn session<'a>(
        ctx: &'a RunContext,
        probe: &'a FakeProbe,
        answers: &[&str],
    ) -> (Session<'a, ScriptedReader>, Arc<RecordingRunner>) {
        session_with_outcomes(ctx, probe, answers, &[])
    }

    /// Like [`session`], with commands replaying `outcomes` in order.
    pub fn session_with_outcomes<'a>(
        ctx: &'a RunContext,
        probe: &'a FakeProbe,
        answers: &[&str],
        outcomes: &[Outcome],
    ) -> (Session<'a, ScriptedReader>, Arc<RecordingRunner>) {
        let runner = RecordingRunner::with_outcomes(outcomes);
        let executor = Executor::with_runner(ExecMode::FullLog, runner.clone());
        let session =
            Session::new(ctx, probe, scripted(answers), executor).with_notifier(runner.clone());
        (session, runner)
    }
}
