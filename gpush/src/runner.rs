use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::command_spec::{CommandDefinition, CommandSpec};
use crate::error::GpushError;
use crate::format::ansi;
use crate::gate::{self, GateDecision};
use crate::live_progress::{Console, StatusSegment, StatusSource};
use crate::process::shell_command;
use crate::report::CommandReport;
use crate::run::RunError;
use crate::status::CommandStatus;
use crate::streaming::{ProcessExit, StreamAdapter, run_streaming_pty};

#[derive(Debug)]
struct RunnerState {
    status: CommandStatus,
    output: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessGroupState {
    Pending,
    Live(i32),
    Closed { spawned: bool },
}

/// What a waiter learned about a runner's process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessGroupLookup {
    Live(i32),
    NeverSpawned,
    Exited,
    TimedOut,
}

/// Resolved exactly once when the child spawns (or when the runner finishes without one),
/// then closed when the child is reaped so a recycled id is never signalled.
#[derive(Debug)]
struct ProcessGroupSlot {
    state: Mutex<ProcessGroupState>,
    resolved: Condvar,
}

impl ProcessGroupSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(ProcessGroupState::Pending),
            resolved: Condvar::new(),
        }
    }

    fn publish(&self, pgid: i32) {
        if let Ok(mut state) = self.state.lock() {
            if *state == ProcessGroupState::Pending {
                *state = ProcessGroupState::Live(pgid);
            }
        }
        self.resolved.notify_all();
    }

    fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = match *state {
                ProcessGroupState::Pending => ProcessGroupState::Closed { spawned: false },
                ProcessGroupState::Live(_) | ProcessGroupState::Closed { spawned: true } => {
                    ProcessGroupState::Closed { spawned: true }
                }
                ProcessGroupState::Closed { spawned: false } => {
                    ProcessGroupState::Closed { spawned: false }
                }
            };
        }
        self.resolved.notify_all();
    }

    fn lookup(state: ProcessGroupState) -> ProcessGroupLookup {
        match state {
            ProcessGroupState::Pending => ProcessGroupLookup::TimedOut,
            ProcessGroupState::Live(pgid) => ProcessGroupLookup::Live(pgid),
            ProcessGroupState::Closed { spawned: true } => ProcessGroupLookup::Exited,
            ProcessGroupState::Closed { spawned: false } => ProcessGroupLookup::NeverSpawned,
        }
    }

    fn wait(&self, timeout: Duration) -> ProcessGroupLookup {
        let Ok(guard) = self.state.lock() else {
            return ProcessGroupLookup::TimedOut;
        };
        match self.resolved.wait_timeout_while(guard, timeout, |state| {
            *state == ProcessGroupState::Pending
        }) {
            Ok((state, _)) => Self::lookup(*state),
            Err(_) => ProcessGroupLookup::TimedOut,
        }
    }
}

/// Closes the process-group slot on every exit path out of [`ProcessRunner::run`].
struct CloseSlotOnDrop<'a>(&'a ProcessGroupSlot);

impl Drop for CloseSlotOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

pub fn prefixed_line(prefix: &str, line: &str) -> String {
    format!("{} {line}", ansi::yellow(&format!("{prefix}:")))
}

/// Runs one configured command and owns everything about it: its status, its captured
/// output and its child process. Other threads only read, except for the interrupt
/// coordinator which may move a live runner to `Interrupting`.
pub struct ProcessRunner {
    name: String,
    command: Result<CommandSpec, String>,
    verbose: bool,
    prefix_output: bool,
    console: Arc<Console>,
    state: Mutex<RunnerState>,
    process_group: ProcessGroupSlot,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("name", &self.name)
            .field("verbose", &self.verbose)
            .field("status", &self.status())
            .finish()
    }
}

struct RunnerStream<'a> {
    runner: &'a ProcessRunner,
}

impl StreamAdapter for RunnerStream<'_> {
    fn on_spawn(&mut self, pid: u32) {
        // The child leads its own session, so its pid is the group id.
        let pgid = pid as i32;
        debug!(command = %self.runner.name, pgid, "spawned");
        self.runner.process_group.publish(pgid);
    }

    fn on_line(&mut self, line: &str) {
        self.runner.record_line(line);
    }
}

impl ProcessRunner {
    pub fn new(definition: CommandDefinition, batch_verbose: bool, console: Arc<Console>) -> Self {
        let (name, command, verbose) = match definition {
            Ok(spec) => {
                let verbose = spec.verbose_or(batch_verbose);
                (spec.display_name().to_string(), Ok(spec), verbose)
            }
            Err(GpushError::InvalidCommand { name, message }) => (name, Err(message), batch_verbose),
            Err(other) => (
                "<invalid command>".to_string(),
                Err(other.to_string()),
                batch_verbose,
            ),
        };
        Self {
            name,
            command,
            verbose,
            prefix_output: true,
            console,
            state: Mutex::new(RunnerState {
                status: CommandStatus::NotStarted,
                output: vec![],
            }),
            process_group: ProcessGroupSlot::new(),
        }
    }

    pub fn from_spec(spec: CommandSpec, batch_verbose: bool, console: Arc<Console>) -> Self {
        Self::new(Ok(spec), batch_verbose, console)
    }

    /// Streams output live whatever the command's own `verbose` setting says.
    pub fn always_verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Streams verbose output without the `name:` prefix.
    pub fn without_prefix(mut self) -> Self {
        self.prefix_output = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> Option<&CommandSpec> {
        self.command.as_ref().ok()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn lock_state(&self) -> MutexGuard<'_, RunnerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> CommandStatus {
        self.lock_state().status
    }

    pub fn output(&self) -> Vec<String> {
        self.lock_state().output.clone()
    }

    pub fn segment(&self) -> StatusSegment {
        let state = self.lock_state();
        StatusSegment {
            name: self.name.clone(),
            status: state.status,
            verbose: self.verbose,
            output_lines: state.output.len(),
        }
    }

    pub fn report(&self) -> CommandReport {
        let state = self.lock_state();
        CommandReport {
            name: self.name.clone(),
            status: state.status,
            verbose: self.verbose,
            output: state.output.clone(),
        }
    }

    /// The live process group id, if the child is currently running.
    pub fn process_group(&self) -> Option<i32> {
        match self.process_group.state.lock().map(|s| *s) {
            Ok(ProcessGroupState::Live(pgid)) => Some(pgid),
            _ => None,
        }
    }

    pub fn wait_for_process_group(&self, timeout: Duration) -> ProcessGroupLookup {
        self.process_group.wait(timeout)
    }

    /// Moves a runner that has not finished yet to `Interrupting`. Returns false when the
    /// runner was already stopping or finished.
    pub fn mark_interrupting(&self) -> bool {
        let mut state = self.lock_state();
        match state.status {
            CommandStatus::NotStarted | CommandStatus::Working => {
                state.status = CommandStatus::Interrupting;
                true
            }
            CommandStatus::Interrupting
            | CommandStatus::Success
            | CommandStatus::Fail
            | CommandStatus::Skipped
            | CommandStatus::Interrupted => false,
        }
    }

    fn begin(&self) -> Result<bool, GpushError> {
        let mut state = self.lock_state();
        match state.status {
            CommandStatus::NotStarted => {
                state.status = CommandStatus::Working;
                Ok(true)
            }
            CommandStatus::Interrupting => Ok(false),
            other => Err(GpushError::Internal(format!(
                "command {:?} was started twice (status {other})",
                self.name
            ))),
        }
    }

    /// The only place a terminal status is written. A runner that was asked to stop always
    /// ends as `Interrupted`, whatever the child did afterwards.
    fn finish(&self, status: CommandStatus) -> CommandStatus {
        let mut state = self.lock_state();
        if state.status.is_terminal() {
            return state.status;
        }
        state.status = match state.status {
            CommandStatus::Interrupting => CommandStatus::Interrupted,
            _ => status,
        };
        info!(command = %self.name, status = %state.status, "command finished");
        state.status
    }

    fn record_line(&self, line: &str) {
        if self.verbose {
            if self.prefix_output {
                self.console.println(&prefixed_line(&self.name, line));
            } else {
                self.console.println(line);
            }
        }
        self.lock_state().output.push(line.to_string());
    }

    /// Maps an error raised by [`ProcessRunner::run`] to `Fail`, recording the message like
    /// any other output line so it is shown with the failed command.
    pub fn record_failure(&self, err: &GpushError) {
        let message = match err {
            GpushError::Run(RunError::SpawnFailed(_) | RunError::PtyFailed(_)) => {
                error!(command = %self.name, error = %err, "process never started");
                format!("gpush: process never started: {err}")
            }
            GpushError::InvalidCommand { .. } => {
                error!(command = %self.name, error = %err, "invalid command definition");
                format!("gpush: {err}")
            }
            _ => {
                error!(command = %self.name, error = %err, "command runner failed");
                format!("gpush: command runner failed: {err}")
            }
        };
        self.record_line(&message);
        self.finish(CommandStatus::Fail);
    }

    /// Runs the condition (if any) and then the command itself, blocking until it ends.
    pub fn run(&self) -> Result<(), GpushError> {
        let _close_slot = CloseSlotOnDrop(&self.process_group);
        if !self.begin()? {
            self.finish(CommandStatus::Interrupted);
            return Ok(());
        }
        let spec = match &self.command {
            Ok(spec) => spec,
            Err(message) => return Err(GpushError::invalid_command(&self.name, message.clone())),
        };

        match gate::evaluate(spec, &self.name, self.verbose, &self.console)? {
            GateDecision::Run => {}
            GateDecision::Skip => {
                self.finish(CommandStatus::Skipped);
                return Ok(());
            }
            GateDecision::Interrupted => {
                self.finish(CommandStatus::Interrupted);
                return Ok(());
            }
        }

        if self.status() == CommandStatus::Interrupting {
            self.finish(CommandStatus::Interrupted);
            return Ok(());
        }

        let command = shell_command(&spec.shell, &spec.env);
        let exit = run_streaming_pty(command, &mut RunnerStream { runner: self })?;
        debug!(command = %self.name, ?exit, "child exited");
        self.finish(match exit {
            ProcessExit::Signal(_) => CommandStatus::Interrupted,
            ProcessExit::Code(0) => CommandStatus::Success,
            ProcessExit::Code(_) => CommandStatus::Fail,
        });
        Ok(())
    }

    /// [`ProcessRunner::run`] with any error mapped to `Fail`. A runner that already
    /// finished is left untouched.
    pub fn run_to_completion(&self) -> CommandStatus {
        let status = self.status();
        if status.is_terminal() {
            debug!(command = %self.name, %status, "already finished");
            return status;
        }
        if let Err(err) = self.run() {
            self.record_failure(&err);
        }
        self.status()
    }
}

impl StatusSource for Vec<Arc<ProcessRunner>> {
    fn segments(&self) -> Vec<StatusSegment> {
        self.iter().map(|runner| runner.segment()).collect()
    }
}
