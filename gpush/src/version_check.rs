use duct::cmd as duct_cmd;
use semver::Version;
use serde_json::Value as JsonValue;
use tracing::debug;
use which::which;

use crate::format::ansi;

pub const DEFAULT_VERSION: &str = "local-development";

/// `GPUSH_VERSION`, set by the packaged launcher, or [`DEFAULT_VERSION`].
pub fn current_version() -> String {
    std::env::var("GPUSH_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// Accepts `1.2` as `1.2.0` and a leading `v`.
pub fn parse_lenient(version: &str) -> Option<Version> {
    let trimmed = version.trim().trim_start_matches('v');
    if let Ok(parsed) = Version::parse(trimmed) {
        return Some(parsed);
    }
    let parts = trimmed.split('.').count();
    let padded = match parts {
        1 => format!("{trimmed}.0.0"),
        2 => format!("{trimmed}.0"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

pub fn newer_version_available(current: &str, latest: &str) -> bool {
    match (parse_lenient(current), parse_lenient(latest)) {
        (Some(current), Some(latest)) => latest > current,
        _ => false,
    }
}

/// Pulls `[0].versions.stable` out of `brew info --json=v1` output.
pub fn stable_version_from_brew_json(raw: &str) -> Option<String> {
    let info = serde_json::from_str::<JsonValue>(raw).ok()?;
    info.get(0)?
        .get("versions")?
        .get("stable")?
        .as_str()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn latest_brew_version() -> Option<String> {
    which("brew").ok()?;
    let out = duct_cmd("brew", ["info", "gpush", "--json=v1"])
        .stdout_capture()
        .stderr_null()
        .unchecked()
        .run()
        .ok()
        .filter(|o| o.status.success())?;
    stable_version_from_brew_json(&String::from_utf8_lossy(&out.stdout))
}

pub fn update_message(current: &str, latest: &str) -> Vec<String> {
    vec![
        String::new(),
        format!("💎 A new version of gpush is available: {latest} (you have {current})"),
        "💎 Update with:".to_string(),
        format!("    {}", ansi::green(&ansi::bold("brew update && brew upgrade gpush"))),
    ]
}

/// Lines to print when Homebrew has a newer gpush than `current`. Any failure means nothing.
pub fn check_for_update(current: &str) -> Option<Vec<String>> {
    if current == DEFAULT_VERSION {
        return None;
    }
    let latest = latest_brew_version()?;
    debug!(current, latest = %latest, "checked for updates");
    newer_version_available(current, &latest).then(|| update_message(current, &latest))
}
