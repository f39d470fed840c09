use semver::Version;

use crate::version_check::{
    DEFAULT_VERSION, check_for_update, newer_version_available, parse_lenient,
    stable_version_from_brew_json, update_message,
};

#[test]
fn short_versions_are_padded() {
    assert_eq!(parse_lenient("1.2"), Some(Version::new(1, 2, 0)));
    assert_eq!(parse_lenient("v3"), Some(Version::new(3, 0, 0)));
    assert_eq!(parse_lenient("2.0.1"), Some(Version::new(2, 0, 1)));
    assert_eq!(parse_lenient("local-development"), None);
}

#[test]
fn newer_only_when_strictly_greater() {
    assert!(newer_version_available("1.2", "1.10.0"));
    assert!(!newer_version_available("1.10.0", "1.10"));
    assert!(!newer_version_available("2.0.0", "1.9.9"));
    assert!(!newer_version_available("garbage", "1.0.0"));
}

#[test]
fn stable_version_is_read_from_brew_info() {
    let raw = r#"[{"name":"gpush","versions":{"stable":"1.4.2","head":null}}]"#;
    assert_eq!(stable_version_from_brew_json(raw).as_deref(), Some("1.4.2"));
    assert_eq!(stable_version_from_brew_json("[]"), None);
    assert_eq!(stable_version_from_brew_json(r#"[{"versions":{}}]"#), None);
    assert_eq!(stable_version_from_brew_json("not json"), None);
}

#[test]
fn development_builds_never_check() {
    assert_eq!(check_for_update(DEFAULT_VERSION), None);
}

#[test]
fn update_message_names_both_versions() {
    let lines = update_message("1.0.0", "1.1.0");
    assert!(lines[1].contains("1.1.0 (you have 1.0.0)"));
    assert!(lines[3].contains("brew update && brew upgrade gpush"));
}
