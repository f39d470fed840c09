use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::GpushError;

pub const ENV_ERROR_MESSAGE: &str = "The 'env' field must be a hash of key-value pairs";

/// One configured command, as written under a phase in `gpushrc.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub name: Option<String>,
    pub shell: String,
    pub condition: Option<String>,
    pub env: IndexMap<String, String>,
    pub verbose: Option<bool>,
}

/// A config entry that may have failed validation. Invalid entries still get a runner so the
/// failure is reported alongside its siblings instead of aborting the batch.
pub type CommandDefinition = Result<CommandSpec, GpushError>;

impl CommandSpec {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Falls back to the shell text when no name is configured.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.shell)
    }

    pub fn verbose_or(&self, batch_verbose: bool) -> bool {
        self.verbose.unwrap_or(batch_verbose)
    }

    pub fn validate(&self) -> Result<(), GpushError> {
        if self.shell.trim().is_empty() {
            return Err(GpushError::invalid_command(
                self.display_name(),
                "must have a \"shell\" field.",
            ));
        }
        Ok(())
    }

    pub fn from_yaml(value: &Value) -> Result<Self, GpushError> {
        let Some(map) = value.as_mapping() else {
            return Err(GpushError::invalid_command(
                describe_value(value),
                "command entries must be mappings with a \"shell\" field",
            ));
        };
        let text_field = |key: &str| -> Result<Option<String>, GpushError> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => scalar_to_string(other).map(Some).ok_or_else(|| {
                    GpushError::invalid_command(
                        describe_value(value),
                        format!("the '{key}' field must be a string"),
                    )
                }),
            }
        };

        let name = text_field("name")?;
        let shell = text_field("shell")?.unwrap_or_default();
        let condition = text_field("if")?;
        let display = name.clone().unwrap_or_else(|| shell.clone());

        let env = match map.get("env") {
            None | Some(Value::Null) => IndexMap::new(),
            Some(Value::Mapping(entries)) => entries
                .iter()
                .map(|(k, v)| match (scalar_to_string(k), scalar_to_string(v)) {
                    (Some(k), Some(v)) => Ok((k, v)),
                    _ => Err(GpushError::invalid_command(&display, ENV_ERROR_MESSAGE)),
                })
                .collect::<Result<IndexMap<_, _>, _>>()?,
            Some(_) => return Err(GpushError::invalid_command(&display, ENV_ERROR_MESSAGE)),
        };

        let verbose = match map.get("verbose") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                return Err(GpushError::invalid_command(
                    &display,
                    "the 'verbose' field must be true or false",
                ));
            }
        };

        let spec = Self {
            name,
            shell,
            condition,
            env,
            verbose,
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Best-effort label for an entry that could not be parsed.
pub fn describe_value(value: &Value) -> String {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    field("name")
        .or_else(|| field("shell"))
        .unwrap_or_else(|| "<unnamed command>".to_string())
}
