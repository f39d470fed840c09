use std::path::Path;

use crate::config::{
    GpushConfig, config_file_path, display_config_path, load_config, normalize_command_name,
    parse_config_str,
};
use crate::error::GpushError;

fn parse(raw: &str) -> Result<GpushConfig, GpushError> {
    parse_config_str(raw, Path::new("gpushrc.yml"))
}

#[test]
fn discovery_walks_up_to_the_nearest_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let nested = tmp.path().join("a").join("b");
    std::fs::create_dir_all(&nested).expect("mkdir");
    std::fs::write(tmp.path().join("gpushrc.yaml"), "verbose: true\n").expect("write");
    std::fs::write(tmp.path().join("a").join("gpushrc.yml"), "verbose: false\n").expect("write");

    let found = config_file_path(&nested, None).expect("found");
    assert_eq!(found, tmp.path().join("a").join("gpushrc.yml"));

    let (_, config) = load_config(&nested, None).expect("load");
    assert_eq!(config.verbose, Some(false));
}

#[test]
fn yml_wins_over_yaml_in_the_same_directory() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("gpushrc.yaml"), "verbose: true\n").expect("write");
    std::fs::write(tmp.path().join("gpushrc.yml"), "verbose: true\n").expect("write");
    let found = config_file_path(tmp.path(), None).expect("found");
    assert_eq!(found, tmp.path().join("gpushrc.yml"));
}

#[test]
fn explicit_config_file_must_exist() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = config_file_path(tmp.path(), Some(Path::new("missing.yml"))).expect_err("missing");
    assert_eq!(err.to_string(), "Config file not found: missing.yml");

    std::fs::write(tmp.path().join("custom.yml"), "verbose: true\n").expect("write");
    let found = config_file_path(tmp.path(), Some(Path::new("custom.yml"))).expect("found");
    assert_eq!(found, tmp.path().join("custom.yml"));
}

#[test]
fn no_config_anywhere_names_both_file_names() {
    let tmp = tempfile::tempdir().expect("tempdir");
    match config_file_path(tmp.path(), None) {
        Err(GpushError::ConfigNotFound { names }) => {
            assert_eq!(names, "gpushrc.yml or gpushrc.yaml")
        }
        // A gpushrc above the temp dir would be found instead; nothing to check then.
        Ok(path) => assert!(!path.starts_with(tmp.path())),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_config_is_an_error() {
    assert!(matches!(parse(""), Err(GpushError::ConfigEmpty { .. })));
    assert!(matches!(parse("{}"), Err(GpushError::ConfigEmpty { .. })));
    assert!(matches!(
        parse("- just a list"),
        Err(GpushError::ConfigParse { .. })
    ));
}

#[test]
fn sections_become_command_definitions() {
    let config = parse(
        r#"
pre_run:
  - shell: npm install
parallel_run:
  - name: lint
    shell: npm run lint
  - name: broken
    env: [1, 2]
    shell: echo broken
  - name: no shell
success_emoji: "🚀"
"#,
    )
    .expect("parse");
    assert_eq!(config.pre_run().len(), 1);
    let parallel = config.parallel_run();
    assert_eq!(parallel.len(), 3);
    assert_eq!(
        parallel[0].as_ref().map(|s| s.shell.as_str()).ok(),
        Some("npm run lint")
    );
    assert!(matches!(parallel[1], Err(GpushError::InvalidCommand { .. })));
    assert!(matches!(parallel[2], Err(GpushError::InvalidCommand { .. })));
    assert!(config.post_run().is_empty());
    assert_eq!(config.success_emoji.as_deref(), Some("🚀"));
}

#[test]
fn fix_distinguishes_missing_from_empty() {
    let missing = parse("verbose: false\n").expect("parse");
    assert!(missing.fix().is_none());
    let empty = parse("fix: []\n").expect("parse");
    assert_eq!(empty.fix().map(|f| f.len()), Some(0));
}

#[test]
fn command_names_match_loosely() {
    assert_eq!(normalize_command_name("  Unit_Tests "), "unittests");
    assert_eq!(normalize_command_name("unit-tests"), "unittests");

    let config = parse(
        r#"
parallel_run:
  - name: Unit Tests
    shell: cargo test
  - shell: npm run lint
"#,
    )
    .expect("parse");
    let found = config.find_parallel_command("unit_tests").expect("by name");
    assert_eq!(found.get("shell").and_then(|v| v.as_str()), Some("cargo test"));
    let by_shell = config.find_parallel_command("NPM RUN LINT").expect("by shell");
    assert_eq!(by_shell.get("shell").and_then(|v| v.as_str()), Some("npm run lint"));
    assert!(config.find_parallel_command("deploy").is_none());
}

#[test]
fn display_path_is_relative_to_the_repo_root() {
    let root = Path::new("/work/app");
    assert_eq!(
        display_config_path(&root.join("gpushrc.yml"), Some(root)),
        "gpushrc.yml"
    );
    assert_eq!(
        display_config_path(Path::new("/elsewhere/gpushrc.yml"), Some(root)),
        "/elsewhere/gpushrc.yml"
    );
}
