//! `gpush run <name>` and `gpush fix`.

use std::sync::Arc;

use crate::batch::run_single;
use crate::command_spec::CommandSpec;
use crate::config::GpushConfig;
use crate::error::GpushError;
use crate::format::ansi;
use crate::live_progress::Console;
use crate::runner::ProcessRunner;
use crate::status::CommandStatus;

pub fn exit_code_for(status: CommandStatus) -> i32 {
    match status {
        CommandStatus::Success => 0,
        CommandStatus::Interrupted => 130,
        _ => 1,
    }
}

/// Runs one `parallel_run` command in the foreground, always streaming its output unprefixed.
pub fn run_named_command(
    config: &GpushConfig,
    query: &str,
    console: &Arc<Console>,
) -> Result<i32, GpushError> {
    let Some(entry) = config.find_parallel_command(query) else {
        console.print_block(&[
            format!("Command not found: {query}"),
            "gpush run looks for a command in the parallel_run section of the config file."
                .to_string(),
        ]);
        return Ok(1);
    };
    let runner = Arc::new(
        ProcessRunner::new(CommandSpec::from_yaml(&entry), true, Arc::clone(console))
            .always_verbose()
            .without_prefix(),
    );
    console.println(&ansi::bold(&format!(
        "========== Running command: {} ==========",
        runner.name()
    )));
    let report = run_single(runner, Arc::clone(console))?;
    console.print_block(&["", report.final_summary().as_str()][..]);
    Ok(exit_code_for(report.status))
}

/// Runs every `fix` command in order, verbosely. Failures do not stop later fixes.
pub fn run_fix(config: &GpushConfig, console: &Arc<Console>) -> Result<i32, GpushError> {
    let Some(fixes) = config.fix() else {
        console.println("No fix section found in config file");
        return Ok(1);
    };
    if fixes.is_empty() {
        console.println("Fix section is empty");
        return Ok(1);
    }
    for definition in fixes {
        let runner = Arc::new(
            ProcessRunner::new(definition, true, Arc::clone(console))
                .always_verbose()
                .without_prefix(),
        );
        run_single(runner, Arc::clone(console))?;
    }
    Ok(0)
}
