use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

mod frame;
mod ticker;

pub use frame::{StatusSegment, fit_segments, frame_physical_line_count, render_status_line};

use crate::format::terminal::terminal_columns;

pub const DEFAULT_TICK: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveProgressMode {
    Off,
    Plain,
    Interactive,
}

pub fn live_progress_mode_with_env_ci(stdout_is_tty: bool, env_ci: bool) -> LiveProgressMode {
    if stdout_is_tty && !env_ci {
        return LiveProgressMode::Interactive;
    }
    LiveProgressMode::Plain
}

pub fn live_progress_mode(stdout_is_tty: bool) -> LiveProgressMode {
    let env_ci = std::env::var("CI").ok().is_some();
    live_progress_mode_with_env_ci(stdout_is_tty, env_ci)
}

/// Anything that can report the live status of a set of commands.
pub trait StatusSource: Send + Sync {
    fn segments(&self) -> Vec<StatusSegment>;
}

struct ConsoleInner {
    out: Box<dyn Write + Send>,
    frame_lines: usize,
}

/// The single shared output sink. Every write holds the lock for a whole line, so lines
/// from concurrent commands never interleave mid-line, and an in-place status frame is
/// cleared before anything else is printed over it.
pub struct Console {
    inner: Mutex<ConsoleInner>,
    interactive: bool,
}

/// In-memory writer that a [`Console`] can print into.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("shared buffer poisoned"))?;
        buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Console {
    pub fn stdout() -> Self {
        let interactive = std::io::stdout().is_terminal();
        Self::to_writer(std::io::stdout(), interactive)
    }

    pub fn to_writer(out: impl Write + Send + 'static, interactive: bool) -> Self {
        Self {
            inner: Mutex::new(ConsoleInner {
                out: Box::new(out),
                frame_lines: 0,
            }),
            interactive,
        }
    }

    pub fn capture() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::to_writer(buffer.clone(), false), buffer)
    }

    pub fn println(&self, line: &str) {
        self.print_block(std::slice::from_ref(&line));
    }

    /// Prints several lines without letting another writer in between.
    pub fn print_block<S: AsRef<str>>(&self, lines: &[S]) {
        if let Ok(mut inner) = self.inner.lock() {
            let prev_lines = std::mem::take(&mut inner.frame_lines);
            frame::clear_previous_frame(&mut *inner.out, prev_lines);
            for line in lines {
                let _ = inner.out.write_all(line.as_ref().as_bytes());
                let _ = inner.out.write_all(b"\n");
            }
            let _ = inner.out.flush();
        }
    }

    /// Replaces the current in-place frame. Non-interactive consoles get a plain line instead.
    pub fn repaint(&self, frame: &str) {
        if !self.interactive {
            self.println(frame);
            return;
        }
        if let Ok(mut inner) = self.inner.lock() {
            let prev_lines = inner.frame_lines;
            frame::clear_previous_frame(&mut *inner.out, prev_lines);
            let _ = inner.out.write_all(frame.as_bytes());
            let _ = inner.out.flush();
            inner.frame_lines = frame_physical_line_count(frame, terminal_columns());
        }
    }

    /// Leaves the current frame on screen and moves below it.
    pub fn settle(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.frame_lines > 0 {
                inner.frame_lines = 0;
                let _ = inner.out.write_all(b"\n");
                let _ = inner.out.flush();
            }
        }
    }
}

/// Background repaint of the status line for a running batch.
pub struct LiveProgress {
    mode: LiveProgressMode,
    console: Arc<Console>,
    stop_tx: Option<mpsc::Sender<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl LiveProgress {
    /// Starts repainting every `tick`. With `sticky` set (verbose batches) the line is only
    /// printed when some command's status changes, since command output scrolls past it.
    pub fn start(
        console: Arc<Console>,
        source: Arc<dyn StatusSource>,
        mode: LiveProgressMode,
        sticky: bool,
        tick: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let ticker = match mode {
            LiveProgressMode::Off => None,
            LiveProgressMode::Plain | LiveProgressMode::Interactive => {
                Some(ticker::spawn_ticker(ticker::TickerShared {
                    console: Arc::clone(&console),
                    source,
                    mode,
                    sticky,
                    tick,
                    stop_rx,
                }))
            }
        };
        Self {
            mode,
            console,
            stop_tx: Some(stop_tx),
            ticker,
        }
    }

    fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }
    }

    /// Stops the ticker and prints `final_line` as the last status line.
    pub fn finish(mut self, final_line: Option<&str>) {
        self.stop();
        let Some(line) = final_line else {
            self.console.settle();
            return;
        };
        match self.mode {
            LiveProgressMode::Off => {}
            LiveProgressMode::Interactive => {
                self.console.repaint(line);
                self.console.settle();
            }
            LiveProgressMode::Plain => self.console.println(line),
        }
    }
}

impl Drop for LiveProgress {
    fn drop(&mut self) {
        self.stop();
    }
}
