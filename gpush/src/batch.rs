use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::command_spec::CommandDefinition;
use crate::error::GpushError;
use crate::format::ansi;
use crate::format::terminal::terminal_columns;
use crate::interrupt::InterruptCoordinator;
use crate::live_progress::{
    Console, DEFAULT_TICK, LiveProgress, LiveProgressMode, StatusSource, live_progress_mode,
    render_status_line,
};
use crate::report::{BatchReport, CommandReport};
use crate::runner::ProcessRunner;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub verbose: bool,
    pub mode: LiveProgressMode,
    pub tick: Duration,
    /// Route process-wide Ctrl-C to this batch while it runs.
    pub handle_ctrl_c: bool,
}

impl BatchOptions {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            mode: live_progress_mode(std::io::IsTerminal::is_terminal(&std::io::stdout())),
            tick: DEFAULT_TICK,
            handle_ctrl_c: true,
        }
    }

    pub fn with_mode(mut self, mode: LiveProgressMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_ctrl_c(mut self, handle_ctrl_c: bool) -> Self {
        self.handle_ctrl_c = handle_ctrl_c;
        self
    }
}

/// Runs a batch of independent commands concurrently, one thread each, with a live status
/// line, and reports once every command has finished.
pub struct ParallelBatchRunner {
    console: Arc<Console>,
    options: BatchOptions,
}

impl ParallelBatchRunner {
    pub fn new(console: Arc<Console>, options: BatchOptions) -> Self {
        Self { console, options }
    }

    pub fn runners_for(&self, definitions: Vec<CommandDefinition>) -> Vec<Arc<ProcessRunner>> {
        definitions
            .into_iter()
            .map(|definition| {
                Arc::new(ProcessRunner::new(
                    definition,
                    self.options.verbose,
                    Arc::clone(&self.console),
                ))
            })
            .collect()
    }

    pub fn run(&self, definitions: Vec<CommandDefinition>) -> Result<BatchReport, GpushError> {
        self.run_runners(self.runners_for(definitions), |_| {})
    }

    /// Runs `runners`, handing the batch's interrupt coordinator to `on_start` before any
    /// command is launched.
    pub fn run_runners(
        &self,
        runners: Vec<Arc<ProcessRunner>>,
        on_start: impl FnOnce(Arc<InterruptCoordinator>),
    ) -> Result<BatchReport, GpushError> {
        debug!(commands = runners.len(), verbose = self.options.verbose, "starting batch");
        let coordinator = Arc::new(InterruptCoordinator::new(
            &runners,
            Arc::clone(&self.console),
        ));
        let guard = self
            .options
            .handle_ctrl_c
            .then(|| coordinator.install());
        on_start(Arc::clone(&coordinator));

        let source: Arc<dyn StatusSource> = Arc::new(runners.clone());
        let progress = LiveProgress::start(
            Arc::clone(&self.console),
            Arc::clone(&source),
            self.options.mode,
            self.options.verbose,
            self.options.tick,
        );

        std::thread::scope(|scope| {
            for runner in &runners {
                scope.spawn(move || {
                    runner.run_to_completion();
                });
            }
        });
        drop(guard);

        let final_line = (!self.options.verbose)
            .then(|| render_status_line(&source.segments(), terminal_columns()));
        progress.finish(final_line.as_deref());

        let report =
            BatchReport::from_commands(runners.iter().map(|runner| runner.report()).collect())?;
        self.print_report(&report);
        Ok(report)
    }

    fn print_report(&self, report: &BatchReport) {
        self.console.println("");
        report
            .commands
            .iter()
            .filter(|command| command.needs_output_dump(self.options.verbose))
            .for_each(|command| self.console.print_block(&command.output_block()));

        let mut summary = vec![String::new(), ansi::bold("Summary")];
        summary.extend(report.commands.iter().map(CommandReport::final_summary));
        summary.extend([String::new(), report.outcome().banner()]);
        self.console.print_block(&summary);
    }
}

/// Runs a single command with Ctrl-C handling but no status line.
pub fn run_single(runner: Arc<ProcessRunner>, console: Arc<Console>) -> Result<CommandReport, GpushError> {
    let coordinator = Arc::new(InterruptCoordinator::new(
        std::slice::from_ref(&runner),
        console,
    ));
    let guard = coordinator.install();
    runner.run_to_completion();
    drop(guard);
    let report = runner.report();
    if !report.status.is_terminal() {
        return Err(GpushError::Internal(format!(
            "command {:?} ended with unexpected status {}",
            report.name, report.status
        )));
    }
    Ok(report)
}
