//! Shared helpers for the subprocess-driven tests under `tests/`.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gpush::command_spec::CommandSpec;
use gpush::interrupt::{GroupSignaller, KillpgSignaller, StopSignal};
use gpush::live_progress::{Console, SharedBuffer};

pub fn captured_console() -> (Arc<Console>, SharedBuffer) {
    let (console, buffer) = Console::capture();
    (Arc::new(console), buffer)
}

pub fn named(name: &str, shell: &str) -> CommandSpec {
    CommandSpec::new(shell).named(name)
}

/// Polls `check` every 10ms until it holds or `timeout` runs out.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}

/// Records every signal and then delivers it for real.
#[derive(Debug, Default)]
pub struct SpySignaller {
    calls: Mutex<Vec<(i32, StopSignal)>>,
}

impl SpySignaller {
    pub fn calls(&self) -> Vec<(i32, StopSignal)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl GroupSignaller for SpySignaller {
    fn signal_group(&self, pgid: i32, signal: StopSignal) -> std::io::Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((pgid, signal));
        }
        KillpgSignaller.signal_group(pgid, signal)
    }
}
