use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, error, info, warn};

use crate::live_progress::Console;
use crate::runner::{ProcessGroupLookup, ProcessRunner};

/// Upper bound on how long a graceful stop waits, in total, for starting commands to
/// publish their process groups.
pub const PROCESS_GROUP_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// SIGINT, the same thing Ctrl-C in a terminal would send.
    Graceful,
    /// SIGKILL.
    Force,
}

/// Delivers a signal to every process in a process group.
pub trait GroupSignaller: Send + Sync {
    fn signal_group(&self, pgid: i32, signal: StopSignal) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KillpgSignaller;

impl GroupSignaller for KillpgSignaller {
    #[cfg(unix)]
    fn signal_group(&self, pgid: i32, signal: StopSignal) -> std::io::Result<()> {
        let signo = match signal {
            StopSignal::Graceful => libc::SIGINT,
            StopSignal::Force => libc::SIGKILL,
        };
        // SAFETY: killpg only takes plain integers and reports failure through errno.
        let rc = unsafe { libc::killpg(pgid, signo) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn signal_group(&self, _pgid: i32, _signal: StopSignal) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process groups are only supported on unix",
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Normal,
    InterruptRequested,
}

/// Names of the commands each interrupt reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptReport {
    pub graceful: Vec<String>,
    pub forced: Vec<String>,
    /// Commands that were still starting when the process-group wait ran out.
    pub unreachable: Vec<String>,
    /// Commands that finished without a process ever being spawned for them.
    pub never_started: Vec<String>,
}

/// Two-step Ctrl-C handling for one batch: the first interrupt asks every running command's
/// process group to stop, the second kills whatever is still alive.
pub struct InterruptCoordinator {
    runners: Vec<Weak<ProcessRunner>>,
    state: Mutex<CoordinatorState>,
    signaller: Arc<dyn GroupSignaller>,
    console: Arc<Console>,
    process_group_wait: Duration,
}

impl InterruptCoordinator {
    pub fn new(runners: &[Arc<ProcessRunner>], console: Arc<Console>) -> Self {
        Self {
            runners: runners.iter().map(Arc::downgrade).collect(),
            state: Mutex::new(CoordinatorState::Normal),
            signaller: Arc::new(KillpgSignaller),
            console,
            process_group_wait: PROCESS_GROUP_WAIT,
        }
    }

    pub fn with_signaller(mut self, signaller: Arc<dyn GroupSignaller>) -> Self {
        self.signaller = signaller;
        self
    }

    pub fn with_process_group_wait(mut self, wait: Duration) -> Self {
        self.process_group_wait = wait;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(CoordinatorState::InterruptRequested)
    }

    fn live_runners(&self) -> impl Iterator<Item = Arc<ProcessRunner>> + '_ {
        self.runners.iter().filter_map(Weak::upgrade)
    }

    /// Handles one interrupt. Safe to call from any thread.
    pub fn interrupt(&self) -> InterruptReport {
        let previous = match self.state.lock() {
            Ok(mut state) => std::mem::replace(&mut *state, CoordinatorState::InterruptRequested),
            Err(_) => CoordinatorState::InterruptRequested,
        };
        match previous {
            CoordinatorState::Normal => self.request_graceful_stop(),
            CoordinatorState::InterruptRequested => self.force_kill(),
        }
    }

    fn request_graceful_stop(&self) -> InterruptReport {
        self.console
            .println("\nCtrl-C detected, attempting to stop gracefully... (Ctrl-C again to force)");
        let mut report = InterruptReport::default();
        // Mark everything first so nothing that has not spawned yet goes on to spawn.
        let stopping = self
            .live_runners()
            .filter(|runner| runner.mark_interrupting())
            .collect::<Vec<_>>();

        // Groups that already exist are signalled before anything is waited on, and every
        // pending runner shares one deadline.
        let mut pending = vec![];
        for runner in stopping {
            match runner.wait_for_process_group(Duration::ZERO) {
                ProcessGroupLookup::TimedOut => pending.push(runner),
                lookup => self.stop_gracefully(&runner, lookup, &mut report),
            }
        }
        let deadline = Instant::now() + self.process_group_wait;
        for runner in pending {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let lookup = runner.wait_for_process_group(remaining);
            self.stop_gracefully(&runner, lookup, &mut report);
        }
        report
    }

    fn stop_gracefully(
        &self,
        runner: &ProcessRunner,
        lookup: ProcessGroupLookup,
        report: &mut InterruptReport,
    ) {
        match lookup {
            ProcessGroupLookup::Live(pgid) => {
                match self.signaller.signal_group(pgid, StopSignal::Graceful) {
                    Ok(()) => {
                        info!(command = %runner.name(), pgid, "sent graceful stop");
                        report.graceful.push(runner.name().to_string());
                    }
                    Err(err) => {
                        warn!(command = %runner.name(), pgid, error = %err, "graceful stop failed");
                    }
                }
            }
            ProcessGroupLookup::Exited => {
                debug!(command = %runner.name(), "process already exited");
            }
            ProcessGroupLookup::NeverSpawned => {
                warn!(
                    command = %runner.name(),
                    "command finished without ever starting a process; nothing to stop"
                );
                report.never_started.push(runner.name().to_string());
            }
            ProcessGroupLookup::TimedOut => {
                error!(
                    command = %runner.name(),
                    waited = ?self.process_group_wait,
                    "command has no process group to signal; it will not be started"
                );
                report.unreachable.push(runner.name().to_string());
            }
        }
    }

    fn force_kill(&self) -> InterruptReport {
        self.console
            .println("\nCtrl-C detected again, killing remaining commands...");
        let mut report = InterruptReport::default();
        for runner in self.live_runners() {
            if runner.status().is_terminal() {
                continue;
            }
            runner.mark_interrupting();
            let Some(pgid) = runner.process_group() else {
                continue;
            };
            match self.signaller.signal_group(pgid, StopSignal::Force) {
                Ok(()) => {
                    info!(command = %runner.name(), pgid, "sent kill");
                    report.forced.push(runner.name().to_string());
                }
                Err(err) => {
                    warn!(command = %runner.name(), pgid, error = %err, "kill failed");
                }
            }
        }
        report
    }

    /// Routes process-wide Ctrl-C to this coordinator until the returned guard is dropped.
    /// Guards nest: dropping one hands Ctrl-C back to whichever coordinator was active before.
    pub fn install(self: &Arc<Self>) -> InterruptGuard {
        if let Err(err) = ensure_handler_installed() {
            warn!(error = %err, "could not install Ctrl-C handler");
        }
        if let Ok(mut stack) = ACTIVE.lock() {
            stack.push(Arc::clone(self));
        }
        InterruptGuard {
            coordinator: Arc::clone(self),
        }
    }
}

pub struct InterruptGuard {
    coordinator: Arc<InterruptCoordinator>,
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Ok(mut stack) = ACTIVE.lock() {
            if let Some(index) = stack
                .iter()
                .rposition(|c| Arc::ptr_eq(c, &self.coordinator))
            {
                stack.remove(index);
            }
        }
    }
}

static ACTIVE: Lazy<Mutex<Vec<Arc<InterruptCoordinator>>>> = Lazy::new(|| Mutex::new(vec![]));
static HANDLER: OnceCell<()> = OnceCell::new();

fn ensure_handler_installed() -> Result<(), ctrlc::Error> {
    HANDLER
        .get_or_try_init(|| ctrlc::set_handler(dispatch_interrupt))
        .map(|_| ())
}

fn dispatch_interrupt() {
    let active = ACTIVE.lock().ok().and_then(|stack| stack.last().cloned());
    match active {
        Some(coordinator) => {
            coordinator.interrupt();
        }
        // Nothing is running: behave like the default handler.
        None => std::process::exit(130),
    }
}
