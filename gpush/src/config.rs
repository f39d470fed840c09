use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use crate::command_spec::{CommandDefinition, CommandSpec};
use crate::error::GpushError;

pub const CONFIG_NAMES: [&str; 2] = ["gpushrc.yml", "gpushrc.yaml"];

static COMMAND_NAME_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]").unwrap());

/// Contents of `gpushrc.yml`. Command lists stay raw so that one malformed entry only fails
/// that command instead of the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GpushConfig {
    pub pre_run: Option<Vec<Value>>,
    pub parallel_run: Option<Vec<Value>>,
    pub post_run: Option<Vec<Value>>,
    pub post_run_success: Option<Vec<Value>>,
    pub post_run_failure: Option<Vec<Value>>,
    pub fix: Option<Vec<Value>>,
    pub verbose: Option<bool>,
    pub success_emoji: Option<String>,
}

fn definitions(section: Option<&Vec<Value>>) -> Vec<CommandDefinition> {
    section
        .map(|values| values.iter().map(CommandSpec::from_yaml).collect())
        .unwrap_or_default()
}

impl GpushConfig {
    pub fn pre_run(&self) -> Vec<CommandDefinition> {
        definitions(self.pre_run.as_ref())
    }

    pub fn parallel_run(&self) -> Vec<CommandDefinition> {
        definitions(self.parallel_run.as_ref())
    }

    pub fn post_run(&self) -> Vec<CommandDefinition> {
        definitions(self.post_run.as_ref())
    }

    pub fn post_run_success(&self) -> Vec<CommandDefinition> {
        definitions(self.post_run_success.as_ref())
    }

    pub fn post_run_failure(&self) -> Vec<CommandDefinition> {
        definitions(self.post_run_failure.as_ref())
    }

    /// `None` when the file has no `fix` section at all.
    pub fn fix(&self) -> Option<Vec<CommandDefinition>> {
        self.fix.as_ref().map(|values| definitions(Some(values)))
    }

    /// Finds a `parallel_run` entry by loosely matching its name (or shell when unnamed).
    pub fn find_parallel_command(&self, query: &str) -> Option<Value> {
        let wanted = normalize_command_name(query);
        self.parallel_run.iter().flatten().find_map(|value| {
            let label = ["name", "shell"]
                .into_iter()
                .find_map(|key| value.get(key).and_then(Value::as_str))?;
            (normalize_command_name(label) == wanted).then(|| value.clone())
        })
    }
}

/// Lowercases and drops whitespace, `_` and `-`, so "Unit Tests" matches "unit-tests".
pub fn normalize_command_name(input: &str) -> String {
    COMMAND_NAME_NOISE
        .replace_all(input.trim(), "")
        .to_lowercase()
}

/// Resolves the config file. An explicit path must exist; otherwise the nearest
/// `gpushrc.yml`/`gpushrc.yaml` from `start` upwards wins, not looking in `/` itself.
pub fn config_file_path(start: &Path, explicit: Option<&Path>) -> Result<PathBuf, GpushError> {
    if let Some(path) = explicit {
        let resolved = start.join(path);
        if !resolved.is_file() {
            return Err(GpushError::ConfigFileMissing {
                path: path.to_path_buf(),
            });
        }
        return Ok(resolved);
    }
    start
        .ancestors()
        .take_while(|dir| dir.parent().is_some())
        .find_map(|dir| {
            CONFIG_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
        .ok_or_else(|| GpushError::ConfigNotFound {
            names: CONFIG_NAMES.join(" or "),
        })
}

/// The config path as shown to the user: relative to the repository root when inside it.
pub fn display_config_path(path: &Path, repo_root: Option<&Path>) -> String {
    repo_root
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

pub fn parse_config_str(raw: &str, path: &Path) -> Result<GpushConfig, GpushError> {
    let parse_error = |message: String| GpushError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };
    if raw.trim().is_empty() {
        return Err(GpushError::ConfigEmpty {
            path: path.to_path_buf(),
        });
    }
    let value = serde_yaml::from_str::<Value>(raw).map_err(|err| parse_error(err.to_string()))?;
    match &value {
        Value::Null => {
            return Err(GpushError::ConfigEmpty {
                path: path.to_path_buf(),
            });
        }
        Value::Mapping(map) if map.is_empty() => {
            return Err(GpushError::ConfigEmpty {
                path: path.to_path_buf(),
            });
        }
        Value::Mapping(_) => {}
        _ => return Err(parse_error("the config must be a YAML mapping".to_string())),
    }
    serde_yaml::from_value::<GpushConfig>(value).map_err(|err| parse_error(err.to_string()))
}

pub fn load_config_from_path(path: &Path) -> Result<GpushConfig, GpushError> {
    let raw = std::fs::read_to_string(path).map_err(|source| GpushError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&raw, path)
}

/// Finds and parses the config, returning where it was found.
pub fn load_config(
    start: &Path,
    explicit: Option<&Path>,
) -> Result<(PathBuf, GpushConfig), GpushError> {
    let path = config_file_path(start, explicit)?;
    debug!(path = %path.display(), "loading config");
    let config = load_config_from_path(&path)?;
    Ok((path, config))
}
