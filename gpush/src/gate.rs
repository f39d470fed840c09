use crate::command_spec::CommandSpec;
use crate::live_progress::Console;
use crate::process::{run_command_capture, shell_command};
use crate::run::RunError;
use crate::runner::prefixed_line;
use crate::streaming::ProcessExit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skip,
    /// The condition itself was killed by a signal (e.g. Ctrl-C reached it first).
    Interrupted,
}

/// Evaluates the command's `if` expression with the same environment as the command.
///
/// This is a plain synchronous run: nothing is streamed, and stdout/stderr are only captured
/// (and echoed) in verbose mode. A missing condition always lets the command run.
pub fn evaluate(
    spec: &CommandSpec,
    name: &str,
    verbose: bool,
    console: &Console,
) -> Result<GateDecision, RunError> {
    let Some(condition) = spec.condition.as_deref() else {
        return Ok(GateDecision::Run);
    };
    if verbose {
        console.println(&format!("running {name} 'if' command: `{condition}`"));
    }
    let output = run_command_capture(shell_command(condition, &spec.env), verbose)?;
    if verbose {
        for (label, text) in [("output", output.stdout_text()), ("ERROR", output.stderr_text())] {
            let prefix = format!("{name} 'if' {label}");
            let lines = text
                .lines()
                .map(|line| prefixed_line(&prefix, line))
                .collect::<Vec<_>>();
            console.print_block(&lines);
        }
    }
    match output.exit {
        ProcessExit::Code(0) => Ok(GateDecision::Run),
        ProcessExit::Signal(_) => Ok(GateDecision::Interrupted),
        ProcessExit::Code(_) => {
            if verbose {
                console.println(&format!("{name} skipped because 'if' condition failed"));
            }
            Ok(GateDecision::Skip)
        }
    }
}
