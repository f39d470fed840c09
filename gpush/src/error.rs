use std::path::PathBuf;

use thiserror::Error;

use crate::run::RunError;

#[derive(Debug, Error)]
pub enum GpushError {
    #[error("Config file not found: {path}")]
    ConfigFileMissing { path: PathBuf },

    #[error("Config file not found (Looking for {names})")]
    ConfigNotFound { names: String },

    #[error("failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Configuration file is empty! ({path})")]
    ConfigEmpty { path: PathBuf },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command {name:?} is invalid: {message}")]
    InvalidCommand { name: String, message: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("{title} command failed - {command}")]
    PhaseFailed { title: String, command: String },

    #[error("No remote branch setup.")]
    NoRemoteBranch,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GpushError {
    pub fn invalid_command(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            name: name.into(),
            message: message.into(),
        }
    }
}
