use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::run::RunError;
use crate::streaming::ProcessExit;

#[derive(Debug)]
pub struct CapturedProcessOutput {
    pub exit: ProcessExit,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedProcessOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Builds a command that evaluates `script` with the platform shell, with `env` applied on top
/// of the inherited environment.
pub fn shell_command(script: &str, env: &IndexMap<String, String>) -> Command {
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd.exe");
        c.args(["/d", "/s", "/c", script]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", script]);
        c
    };
    command.envs(env);
    command
}

fn spawn_capture_thread(
    reader: Option<impl std::io::Read + Send + 'static>,
) -> Option<JoinHandle<Result<Vec<u8>, std::io::Error>>> {
    reader.map(|mut r| {
        std::thread::spawn(move || {
            let mut buf: Vec<u8> = vec![];
            r.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_capture_thread(
    handle: Option<JoinHandle<Result<Vec<u8>, std::io::Error>>>,
    deadline: Instant,
) -> Result<Vec<u8>, RunError> {
    let Some(handle) = handle else {
        return Ok(vec![]);
    };
    // A background grandchild holding the pipe open would block the join forever.
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return Ok(vec![]);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    handle
        .join()
        .map_err(|_| RunError::Io(std::io::Error::other("capture thread panicked")))?
        .map_err(RunError::Io)
}

/// Runs `command` to completion, optionally capturing stdout and stderr separately.
/// Without capture both streams are discarded.
pub fn run_command_capture(
    mut command: Command,
    capture_output: bool,
) -> Result<CapturedProcessOutput, RunError> {
    command.stdin(Stdio::null());
    if capture_output {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }
    let mut child = command.spawn().map_err(RunError::SpawnFailed)?;

    let stdout_thread = spawn_capture_thread(child.stdout.take());
    let stderr_thread = spawn_capture_thread(child.stderr.take());

    let status = child.wait().map_err(RunError::WaitFailed)?;
    let deadline = Instant::now() + Duration::from_millis(250);
    let stdout = join_capture_thread(stdout_thread, deadline)?;
    let stderr = join_capture_thread(stderr_thread, deadline)?;
    Ok(CapturedProcessOutput {
        exit: ProcessExit::from_status(status),
        stdout,
        stderr,
    })
}
