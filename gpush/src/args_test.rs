use std::path::PathBuf;

use crate::args::{GpushCommand, parse_args};

#[test]
fn bare_gpush_runs_the_push_flow() {
    let cli = parse_args(["gpush", "--dry-run", "-v"]).expect("parse");
    assert!(cli.dry_run);
    assert!(cli.verbose);
    assert!(!cli.version);
    assert_eq!(cli.command, None);
}

#[test]
fn run_joins_the_remaining_words_into_one_name() {
    let cli = parse_args(["gpush", "run", "unit", "tests"]).expect("parse");
    let command = cli.command.expect("subcommand");
    assert_eq!(command.run_query().as_deref(), Some("unit tests"));
}

#[test]
fn run_requires_a_name() {
    assert!(parse_args(["gpush", "run"]).is_err());
}

#[test]
fn run_rejects_push_flow_options() {
    assert!(parse_args(["gpush", "run", "lint", "--verbose"]).is_err());
    assert!(parse_args(["gpush", "fix", "--dry-run"]).is_err());
}

#[test]
fn config_file_is_accepted_before_or_after_the_subcommand() {
    let before = parse_args(["gpush", "--config-file", "ci.yml", "fix"]).expect("parse");
    let after = parse_args(["gpush", "fix", "--config-file", "ci.yml"]).expect("parse");
    for cli in [before, after] {
        assert_eq!(cli.command, Some(GpushCommand::Fix));
        assert_eq!(cli.config_file, Some(PathBuf::from("ci.yml")));
    }
}

#[test]
fn version_flag_is_handled_by_gpush() {
    let cli = parse_args(["gpush", "--version"]).expect("parse");
    assert!(cli.version);
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(parse_args(["gpush", "deploy"]).is_err());
}
