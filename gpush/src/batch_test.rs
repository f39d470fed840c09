use std::sync::Arc;

use crate::batch::{BatchOptions, ParallelBatchRunner, run_single};
use crate::command_spec::{CommandDefinition, CommandSpec};
use crate::commands::{run_fix, run_named_command};
use crate::config::parse_config_str;
use crate::error::GpushError;
use crate::format::ansi;
use crate::live_progress::{Console, LiveProgressMode, SharedBuffer};
use crate::run::run_sequential_phase;
use crate::runner::ProcessRunner;
use crate::status::CommandStatus;

fn quiet_batch(verbose: bool) -> (ParallelBatchRunner, SharedBuffer) {
    let (console, buffer) = Console::capture();
    let options = BatchOptions::new(verbose)
        .with_mode(LiveProgressMode::Off)
        .with_ctrl_c(false);
    (ParallelBatchRunner::new(Arc::new(console), options), buffer)
}

fn spec(name: &str, shell: &str) -> CommandDefinition {
    Ok(CommandSpec::new(shell).named(name))
}

#[cfg(unix)]
#[test]
fn failed_quiet_command_has_its_output_dumped() {
    let (batch, buffer) = quiet_batch(false);
    let report = batch
        .run(vec![
            spec("A", "echo hi; exit 0"),
            spec("B", "echo boom; exit 1"),
        ])
        .expect("batch");

    assert!(!report.success);
    assert_eq!(report.status_of("A"), Some(CommandStatus::Success));
    assert_eq!(report.status_of("B"), Some(CommandStatus::Fail));

    let out = ansi::strip(&buffer.contents());
    let header = "========== Output for failed command: B ==========";
    let dump = out.split(header).nth(1).expect("B dumped");
    assert!(dump.lines().any(|l| l == "boom"));
    assert!(!out.contains("Output for failed command: A"));
    assert!(!out.lines().any(|l| l == "hi"));
    assert!(out.contains("B: FAIL"));
    assert!(out.contains("《 Errors detected 》"));
}

#[cfg(unix)]
#[test]
fn failing_condition_skips_without_running_the_command() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let marker = tmp.path().join("ran");
    let (batch, buffer) = quiet_batch(false);
    let report = batch
        .run(vec![Ok(CommandSpec::new(format!("touch {}", marker.display()))
            .named("C")
            .with_condition("exit 1"))])
        .expect("batch");

    assert!(report.success);
    assert_eq!(report.status_of("C"), Some(CommandStatus::Skipped));
    assert!(!marker.exists());
    assert!(ansi::strip(&buffer.contents()).contains("《 No errors detected 》"));
}

#[cfg(unix)]
#[test]
fn condition_sees_the_command_environment() {
    let (batch, _buffer) = quiet_batch(false);
    let report = batch
        .run(vec![Ok(CommandSpec::new("test \"$GATE\" = open")
            .named("gated")
            .with_env("GATE", "open")
            .with_condition("test \"$GATE\" = open"))])
        .expect("batch");
    assert_eq!(report.status_of("gated"), Some(CommandStatus::Success));
}

#[cfg(unix)]
#[test]
fn verbose_batch_streams_prefixed_lines_and_dumps_nothing() {
    let (batch, buffer) = quiet_batch(true);
    let report = batch
        .run(vec![spec("loud", "echo one; echo two >&2; exit 3")])
        .expect("batch");
    assert_eq!(report.status_of("loud"), Some(CommandStatus::Fail));
    let out = ansi::strip(&buffer.contents());
    assert!(out.contains("loud: one"));
    assert!(out.contains("loud: two"));
    assert!(!out.contains("========== Output for"));
}

#[cfg(unix)]
#[test]
fn invalid_definition_fails_only_that_command() {
    let (batch, buffer) = quiet_batch(false);
    let report = batch
        .run(vec![
            Err(GpushError::invalid_command("broken", "must have a \"shell\" field.")),
            spec("fine", "true"),
        ])
        .expect("batch");
    assert_eq!(report.status_of("broken"), Some(CommandStatus::Fail));
    assert_eq!(report.status_of("fine"), Some(CommandStatus::Success));
    assert!(buffer.contents().contains("gpush: command \"broken\" is invalid"));
}

#[test]
fn empty_batch_succeeds() {
    let (batch, _buffer) = quiet_batch(false);
    let report = batch.run(vec![]).expect("batch");
    assert!(report.success);
    assert!(report.commands.is_empty());
}

#[cfg(unix)]
#[test]
fn report_keeps_configuration_order() {
    let (batch, _buffer) = quiet_batch(false);
    let report = batch
        .run(vec![
            spec("slow", "sleep 0.3"),
            spec("fast", "true"),
            spec("middle", "sleep 0.1"),
        ])
        .expect("batch");
    let names = report
        .commands
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["slow", "fast", "middle"]);
}

#[cfg(unix)]
#[test]
fn finished_runner_keeps_its_status_when_run_again() {
    let (console, _buffer) = Console::capture();
    let runner =
        ProcessRunner::from_spec(CommandSpec::new("echo once"), false, Arc::new(console));
    assert_eq!(runner.run_to_completion(), CommandStatus::Success);
    assert_eq!(runner.run_to_completion(), CommandStatus::Success);
    assert_eq!(runner.status(), CommandStatus::Success);
    assert_eq!(runner.output(), vec!["once"]);
}

#[cfg(unix)]
#[test]
fn runner_stopped_before_start_never_spawns() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let marker = tmp.path().join("ran");
    let (console, _buffer) = Console::capture();
    let runner = ProcessRunner::from_spec(
        CommandSpec::new(format!("touch {}", marker.display())),
        false,
        Arc::new(console),
    );
    assert!(runner.mark_interrupting());
    assert!(!runner.mark_interrupting());
    assert_eq!(runner.run_to_completion(), CommandStatus::Interrupted);
    assert!(!marker.exists());
}

#[cfg(unix)]
#[test]
fn signal_death_is_interrupted_not_failed() {
    let (console, _buffer) = Console::capture();
    let runner = Arc::new(ProcessRunner::from_spec(
        CommandSpec::new("kill -TERM $$"),
        false,
        Arc::new(console),
    ));
    let (console, _buffer) = Console::capture();
    let report = run_single(runner, Arc::new(console)).expect("single");
    assert_eq!(report.status, CommandStatus::Interrupted);
}

#[cfg(unix)]
#[test]
fn sequential_phase_halts_at_the_first_failure() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let marker = tmp.path().join("after");
    let (console, buffer) = Console::capture();
    let console = Arc::new(console);
    let err = run_sequential_phase(
        vec![
            Ok(CommandSpec::new("true")),
            Ok(CommandSpec::new("echo nope; exit 3").named("breaks")),
            Ok(CommandSpec::new(format!("touch {}", marker.display()))),
        ],
        "pre-run",
        false,
        &console,
    )
    .expect_err("halts");
    assert!(matches!(err, GpushError::PhaseFailed { ref command, .. } if command == "breaks"));
    assert!(!marker.exists());
    let out = ansi::strip(&buffer.contents());
    assert!(out.contains("Running pre-run..."));
    assert!(out.contains("========== Output for failed command: breaks =========="));
    assert!(out.contains("pre-run command failed - breaks (`echo nope; exit 3`)"));
    assert!(out.contains("Halting further execution and exiting gpush"));
}

#[cfg(unix)]
#[test]
fn sequential_phase_treats_skips_as_passing() {
    let (console, buffer) = Console::capture();
    let console = Arc::new(console);
    run_sequential_phase(
        vec![
            Ok(CommandSpec::new("exit 1").with_condition("false")),
            Ok(CommandSpec::new("true")),
        ],
        "post-run",
        false,
        &console,
    )
    .expect("passes");
    assert!(buffer.contents().lines().any(|l| l == "DONE"));
}

#[test]
fn empty_phase_prints_nothing() {
    let (console, buffer) = Console::capture();
    run_sequential_phase(vec![], "post-run", true, &Arc::new(console)).expect("noop");
    assert_eq!(buffer.contents(), "");
}

#[cfg(unix)]
#[test]
fn run_named_command_streams_without_prefix() {
    let config = parse_config_str(
        "parallel_run:\n  - name: Unit Tests\n    shell: echo from-tests\n",
        std::path::Path::new("gpushrc.yml"),
    )
    .expect("config");
    let (console, buffer) = Console::capture();
    let code = run_named_command(&config, "unit-tests", &Arc::new(console)).expect("run");
    assert_eq!(code, 0);
    let out = ansi::strip(&buffer.contents());
    assert!(out.contains("========== Running command: Unit Tests =========="));
    assert!(out.lines().any(|l| l == "from-tests"));
    assert!(out.contains("Unit Tests: SUCCESS"));
}

#[cfg(unix)]
#[test]
fn run_named_command_streams_even_when_the_command_is_quiet() {
    let config = parse_config_str(
        "parallel_run:\n  - name: Lint\n    shell: echo lint-error-details; exit 1\n    verbose: false\n",
        std::path::Path::new("gpushrc.yml"),
    )
    .expect("config");
    let (console, buffer) = Console::capture();
    let code = run_named_command(&config, "lint", &Arc::new(console)).expect("run");
    assert_eq!(code, 1);
    let out = ansi::strip(&buffer.contents());
    assert!(out.lines().any(|l| l == "lint-error-details"));
    assert!(out.contains("Lint: FAIL"));
}

#[cfg(unix)]
#[test]
fn fix_streams_output_of_quiet_commands() {
    let config = parse_config_str(
        "fix:\n  - shell: echo fixing-things\n    verbose: false\n",
        std::path::Path::new("gpushrc.yml"),
    )
    .expect("config");
    let (console, buffer) = Console::capture();
    assert_eq!(run_fix(&config, &Arc::new(console)).expect("fix"), 0);
    assert!(buffer.contents().lines().any(|l| l == "fixing-things"));
}

#[cfg(unix)]
#[test]
fn commands_run_on_a_terminal() {
    let (batch, _buffer) = quiet_batch(false);
    let report = batch
        .run(vec![spec("tty", "[ -t 1 ] && echo is-tty || echo not-a-tty")])
        .expect("batch");
    let command = report.commands.first().expect("one command");
    assert_eq!(command.status, CommandStatus::Success);
    assert_eq!(command.output, vec!["is-tty"]);
}

#[cfg(unix)]
#[test]
fn deterministic_batches_report_the_same_statuses_every_time() {
    let definitions = || {
        vec![
            spec("ok", "echo fine"),
            spec("bad", "exit 2"),
            Ok(CommandSpec::new("echo never").named("gated").with_condition("false")),
        ]
    };
    let (first_batch, _buffer) = quiet_batch(false);
    let first = first_batch.run(definitions()).expect("first batch");
    let (second_batch, _buffer) = quiet_batch(false);
    let second = second_batch.run(definitions()).expect("second batch");
    assert_eq!(first.statuses(), second.statuses());
    assert_eq!(
        first.statuses(),
        vec![
            CommandStatus::Success,
            CommandStatus::Fail,
            CommandStatus::Skipped
        ]
    );
}

#[test]
fn run_named_command_reports_unknown_names() {
    let config = parse_config_str(
        "parallel_run:\n  - shell: \"true\"\n",
        std::path::Path::new("gpushrc.yml"),
    )
    .expect("config");
    let (console, buffer) = Console::capture();
    let code = run_named_command(&config, "deploy", &Arc::new(console)).expect("run");
    assert_eq!(code, 1);
    assert!(buffer.contents().contains("Command not found: deploy"));
}

#[cfg(unix)]
#[test]
fn fix_runs_every_command_even_after_a_failure() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let marker = tmp.path().join("fixed");
    let raw = format!(
        "fix:\n  - shell: exit 1\n  - shell: touch {}\n",
        marker.display()
    );
    let config =
        parse_config_str(&raw, std::path::Path::new("gpushrc.yml")).expect("config");
    let (console, _buffer) = Console::capture();
    assert_eq!(run_fix(&config, &Arc::new(console)).expect("fix"), 0);
    assert!(marker.exists());

    let (console, buffer) = Console::capture();
    let config = parse_config_str("fix: []\n", std::path::Path::new("gpushrc.yml"))
        .expect("config");
    assert_eq!(run_fix(&config, &Arc::new(console)).expect("fix"), 1);
    assert!(buffer.contents().contains("Fix section is empty"));
}
