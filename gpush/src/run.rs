use std::sync::Arc;

use thiserror::Error;

use crate::batch::run_single;
use crate::command_spec::CommandDefinition;
use crate::error::GpushError;
use crate::live_progress::Console;
use crate::runner::ProcessRunner;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to open a pseudo-terminal: {0}")]
    PtyFailed(std::io::Error),

    #[error("failed to spawn process: {0}")]
    SpawnFailed(std::io::Error),

    #[error("failed to wait on process: {0}")]
    WaitFailed(std::io::Error),

    #[error("io error: {0}")]
    Io(std::io::Error),
}

/// Runs one of the setup/teardown phases: commands one at a time, stopping at the first
/// one that does not pass. Skipped commands count as passing.
pub fn run_sequential_phase(
    definitions: Vec<CommandDefinition>,
    title: &str,
    verbose: bool,
    console: &Arc<Console>,
) -> Result<(), GpushError> {
    if definitions.is_empty() {
        return Ok(());
    }
    let some_verbose = verbose
        || definitions
            .iter()
            .any(|definition| matches!(definition, Ok(spec) if spec.verbose == Some(true)));

    let heading = format!("Running {title}...");
    console.print_block(&["", heading.as_str()][..]);

    for definition in definitions {
        let runner = Arc::new(ProcessRunner::new(definition, verbose, Arc::clone(console)));
        let report = run_single(Arc::clone(&runner), Arc::clone(console))?;
        if report.status.is_passing() {
            continue;
        }
        if report.needs_output_dump(false) {
            console.print_block(&report.output_block());
        }
        let mut message = format!("{title} command failed - {}", report.name);
        if let Some(shell) = runner.spec().map(|spec| spec.shell.as_str()) {
            if shell != report.name {
                message.push_str(&format!(" (`{shell}`)"));
            }
        }
        console.print_block(&[message.as_str(), "Halting further execution and exiting gpush"][..]);
        return Err(GpushError::PhaseFailed {
            title: title.to_string(),
            command: report.name,
        });
    }

    if some_verbose {
        console.print_block(&[format!("{title} DONE"), String::new()][..]);
    } else {
        console.print_block(&["DONE", ""][..]);
    }
    Ok(())
}
