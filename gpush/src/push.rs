use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::batch::{BatchOptions, ParallelBatchRunner};
use crate::config::GpushConfig;
use crate::error::GpushError;
use crate::git::{self, GitRepo};
use crate::live_progress::{Console, LiveProgressMode};
use crate::notifier;
use crate::report::BatchOutcome;
use crate::run::run_sequential_phase;
use crate::version_check;

pub const EXITING_MESSAGE: &str = "\nExiting gpush.";
pub const DEFAULT_SUCCESS_EMOJI: &str = "🌺";

/// Asks the user a yes/no question.
pub trait Prompter {
    fn ask_yes_no(&mut self, question: &str, default: bool) -> Result<bool, GpushError>;
}

/// Line-based prompt: Enter takes the default, `y`/`n` in any case answer, anything else asks
/// again. End of input answers no.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

fn prompt_io_error(source: std::io::Error) -> GpushError {
    GpushError::Io {
        path: "<stdin>".into(),
        source,
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn ask_yes_no(&mut self, question: &str, default: bool) -> Result<bool, GpushError> {
        let choices = if default { "Y/n" } else { "y/N" };
        write!(self.output, "{question} ({choices}): ").map_err(prompt_io_error)?;
        loop {
            self.output.flush().map_err(prompt_io_error)?;
            let mut line = String::new();
            if self.input.read_line(&mut line).map_err(prompt_io_error)? == 0 {
                writeln!(self.output).map_err(prompt_io_error)?;
                return Ok(false);
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => write!(self.output, "Invalid input. Please enter 'y' or 'n': ")
                    .map_err(prompt_io_error)?,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PushOptions {
    pub dry_run: bool,
    pub verbose: bool,
    pub progress: LiveProgressMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    NotARepository,
    Aborted,
    ChecksFailed(BatchOutcome),
    DryRunCompleted,
    Pushed,
    PushFailed,
}

impl PushOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            PushOutcome::NotARepository
            | PushOutcome::Aborted
            | PushOutcome::DryRunCompleted
            | PushOutcome::Pushed => 0,
            PushOutcome::ChecksFailed(BatchOutcome::Interrupted) => 130,
            PushOutcome::ChecksFailed(_) | PushOutcome::PushFailed => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preflight {
    Push,
    PushSettingUpstream,
    DryRun,
    Abort,
}

fn ask_dry_run(prompter: &mut dyn Prompter, question: &str) -> Result<Preflight, GpushError> {
    Ok(if prompter.ask_yes_no(question, true)? {
        Preflight::DryRun
    } else {
        Preflight::Abort
    })
}

/// Decides whether there is anything to push before spending time on the checks.
fn preflight(
    repo_dir: &Path,
    console: &Console,
    prompter: &mut dyn Prompter,
) -> Result<Preflight, GpushError> {
    let repo = GitRepo::discover(repo_dir)?;
    let root = repo.workdir().unwrap_or(repo_dir).to_path_buf();
    if repo.is_detached_head()? {
        console.println("Cannot push from a detached HEAD");
        return ask_dry_run(prompter, "Run tests anyway?");
    }
    if repo.upstream_branch_name().is_none() {
        let question = "No remote branch set. Create branch on origin if tests pass?";
        if prompter.ask_yes_no(question, false)? {
            return Ok(Preflight::PushSettingUpstream);
        }
        return Err(GpushError::NoRemoteBranch);
    }
    git::fetch(&root);
    if repo.behind_upstream() {
        console.println("Cannot push to remote branch");
        console.println(&git::status_summary(&root));
        return ask_dry_run(prompter, "Run tests anyway?");
    }
    if repo.at_same_commit_as_upstream() {
        return ask_dry_run(
            prompter,
            "Your branch is up to date with origin (nothing to push). Run tests anyway?",
        );
    }
    Ok(Preflight::Push)
}

/// The default `gpush` flow: git checks, the configured phases, then `git push`.
pub fn run_push(
    repo_dir: &Path,
    config: &GpushConfig,
    options: PushOptions,
    console: &Arc<Console>,
    prompter: &mut dyn Prompter,
) -> Result<PushOutcome, GpushError> {
    let mut dry_run = options.dry_run;
    let verbose = options.verbose || config.verbose.unwrap_or(false);
    if dry_run {
        console.println("Starting dry run");
    }
    if !git::is_git_repository(repo_dir) {
        console.println("Not inside a Git repository. Exiting.");
        return Ok(PushOutcome::NotARepository);
    }

    let mut set_upstream = false;
    if !dry_run {
        match preflight(repo_dir, console, prompter)? {
            Preflight::Push => {}
            Preflight::PushSettingUpstream => set_upstream = true,
            Preflight::DryRun => {
                console.println("Entering dry run mode");
                dry_run = true;
            }
            Preflight::Abort => {
                console.println(EXITING_MESSAGE);
                return Ok(PushOutcome::Aborted);
            }
        }
    }
    info!(dry_run, set_upstream, verbose, "running checks");

    run_sequential_phase(config.pre_run(), "pre-run", verbose, console)?;
    let batch = ParallelBatchRunner::new(
        Arc::clone(console),
        BatchOptions::new(verbose).with_mode(options.progress),
    );
    let report = batch.run(config.parallel_run())?;
    run_sequential_phase(config.post_run(), "post-run", verbose, console)?;

    if !report.success {
        run_sequential_phase(
            config.post_run_failure(),
            "post-run failure",
            verbose,
            console,
        )?;
        notifier::notify(false, "Finished!");
        console.println("Exiting gpush.");
        return Ok(PushOutcome::ChecksFailed(report.outcome()));
    }

    run_sequential_phase(
        config.post_run_success(),
        "post-run success",
        verbose,
        console,
    )?;
    notifier::notify(true, "Finished!");

    let outcome = if dry_run {
        console.println("《 Dry run completed 》");
        PushOutcome::DryRunCompleted
    } else {
        if set_upstream {
            console.println("Setting up the remote branch...");
        }
        if !git::push(repo_dir, set_upstream)? {
            console.println("git push failed.");
            return Ok(PushOutcome::PushFailed);
        }
        let emoji = config
            .success_emoji
            .as_deref()
            .unwrap_or(DEFAULT_SUCCESS_EMOJI);
        console.println(&format!("《 {emoji} 》 Good job! You're doing great."));
        PushOutcome::Pushed
    };

    if let Some(lines) = version_check::check_for_update(&version_check::current_version()) {
        console.print_block(&lines);
    }
    Ok(outcome)
}
