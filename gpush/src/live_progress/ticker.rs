use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use super::{Console, LiveProgressMode, StatusSource, render_status_line};
use crate::format::terminal::terminal_columns;
use crate::status::CommandStatus;

pub(super) struct TickerShared {
    pub(super) console: Arc<Console>,
    pub(super) source: Arc<dyn StatusSource>,
    pub(super) mode: LiveProgressMode,
    pub(super) sticky: bool,
    pub(super) tick: Duration,
    pub(super) stop_rx: mpsc::Receiver<()>,
}

pub(super) fn spawn_ticker(shared: TickerShared) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut last_statuses: Option<Vec<CommandStatus>> = None;
        loop {
            tick(&shared, &mut last_statuses);
            match shared.stop_rx.recv_timeout(shared.tick) {
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

fn tick(shared: &TickerShared, last_statuses: &mut Option<Vec<CommandStatus>>) {
    let segments = shared.source.segments();
    let line = render_status_line(&segments, terminal_columns());
    let repaint_in_place = shared.mode == LiveProgressMode::Interactive && !shared.sticky;
    if repaint_in_place {
        shared.console.repaint(&line);
        return;
    }
    let statuses = segments.iter().map(|s| s.status).collect::<Vec<_>>();
    if last_statuses.as_ref() == Some(&statuses) {
        return;
    }
    if shared.sticky {
        shared.console.print_block(&["", line.as_str(), ""][..]);
    } else {
        shared.console.println(&line);
    }
    *last_statuses = Some(statuses);
}
