use std::io::{BufRead, BufReader};
use std::process::{Command, ExitStatus};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use portable_pty::{Child, CommandBuilder, PtySize, native_pty_system};

use crate::format::terminal::terminal_columns;
use crate::run::RunError;

/// How a child process ended: a normal exit code, or a description of the signal that
/// terminated it (as `strsignal` words it, e.g. "Killed").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    Code(i32),
    Signal(String),
}

impl ProcessExit {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ProcessExit::Signal(describe_signal(signal));
            }
        }
        ProcessExit::Code(status.code().unwrap_or(1))
    }

    pub fn from_pty_status(status: &portable_pty::ExitStatus) -> Self {
        match status.signal() {
            Some(signal) => ProcessExit::Signal(signal.to_string()),
            None => ProcessExit::Code(status.exit_code() as i32),
        }
    }

    pub fn success(&self) -> bool {
        *self == ProcessExit::Code(0)
    }
}

#[cfg(unix)]
fn describe_signal(signal: i32) -> String {
    // SAFETY: strsignal returns null or a NUL-terminated string that stays valid until the
    // next call on this thread; it is copied out immediately.
    let name = unsafe { libc::strsignal(signal) };
    if name.is_null() {
        return format!("Signal {signal}");
    }
    unsafe { std::ffi::CStr::from_ptr(name) }
        .to_string_lossy()
        .into_owned()
}

pub trait StreamAdapter {
    fn on_spawn(&mut self, _pid: u32) {}

    fn on_line(&mut self, line: &str);
}

fn drain_after_child_exit_deadline(now: Instant) -> Instant {
    now + Duration::from_millis(250)
}

fn recv_poll_interval() -> Duration {
    Duration::from_millis(50)
}

/// Strips the line terminator. The terminal turns `\n` into `\r\n`, so a child that already
/// wrote `\r\n` arrives as `\r\r\n`.
fn normalize_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let end = raw.iter().rposition(|b| *b != b'\r').map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn spawn_lines_thread(reader: impl std::io::Read + Send + 'static, tx: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf: Vec<u8> = Vec::with_capacity(256);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                // Linux reports a hung-up terminal as EIO, possibly after a partial last line.
                Err(_) => {
                    if !buf.is_empty() {
                        let _ = tx.send(normalize_line(&buf));
                    }
                    break;
                }
                Ok(_) => {
                    if tx.send(normalize_line(&buf)).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn drain_channel_until_exit_then_deadline(
    child: &mut (dyn Child + Send + Sync),
    rx: mpsc::Receiver<String>,
    adapter: &mut dyn StreamAdapter,
) -> Result<ProcessExit, RunError> {
    let mut exit: Option<ProcessExit> = None;
    let mut drain_deadline: Option<Instant> = None;
    loop {
        match rx.recv_timeout(recv_poll_interval()) {
            Ok(line) => adapter.on_line(&line),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                if exit.is_some() {
                    if drain_deadline.is_some_and(|deadline| now >= deadline) {
                        break;
                    }
                    continue;
                }
                if let Some(status) = child.try_wait().map_err(RunError::WaitFailed)? {
                    exit = Some(ProcessExit::from_pty_status(&status));
                    drain_deadline = Some(drain_after_child_exit_deadline(now));
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    match exit {
        Some(exit) => Ok(exit),
        None => {
            let status = child.wait().map_err(RunError::WaitFailed)?;
            Ok(ProcessExit::from_pty_status(&status))
        }
    }
}

fn command_builder(command: &Command) -> Result<CommandBuilder, RunError> {
    let mut builder = CommandBuilder::new(command.get_program());
    builder.args(command.get_args());
    // Without an explicit directory the child would start in $HOME.
    let cwd = match command.get_current_dir() {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(RunError::Io)?,
    };
    builder.cwd(cwd);
    for (key, value) in command.get_envs() {
        match value {
            Some(value) => builder.env(key, value),
            None => builder.env_remove(key),
        }
    }
    Ok(builder)
}

/// Runs `command` on a pseudo-terminal, handing each line of its combined output to
/// `adapter` as it arrives. The child sees a tty on stdin, stdout and stderr, and leads a
/// new session, so its pid is also its process group id.
///
/// Never blocks waiting for EOF: background processes may inherit the terminal and keep it
/// open after the direct child exits, so reading stops once the child is gone and a short
/// drain window has elapsed.
pub fn run_streaming_pty(
    command: Command,
    adapter: &mut dyn StreamAdapter,
) -> Result<ProcessExit, RunError> {
    let columns = u16::try_from(terminal_columns()).unwrap_or(u16::MAX);
    let pair = native_pty_system()
        .openpty(PtySize {
            rows: 24,
            cols: columns,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| RunError::PtyFailed(std::io::Error::other(e.to_string())))?;

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| RunError::PtyFailed(std::io::Error::other(e.to_string())))?;
    let builder = command_builder(&command)?;
    let mut child = pair
        .slave
        .spawn_command(builder)
        .map_err(|e| RunError::SpawnFailed(std::io::Error::other(e.to_string())))?;
    // Only the child may hold the slave side, or the reader never sees the hang-up.
    drop(pair.slave);
    if let Some(pid) = child.process_id() {
        adapter.on_spawn(pid);
    }

    let (tx, rx) = mpsc::channel::<String>();
    spawn_lines_thread(reader, tx);

    drain_channel_until_exit_then_deadline(child.as_mut(), rx, adapter)
}
