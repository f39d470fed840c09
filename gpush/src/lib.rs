pub mod args;
pub mod batch;
pub mod command_spec;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod gate;
pub mod git;
pub mod interrupt;
pub mod live_progress;
pub mod logging;
pub mod notifier;
pub mod process;
pub mod push;
pub mod report;
pub mod run;
pub mod runner;
pub mod status;
pub mod streaming;
pub mod version_check;

#[cfg(test)]
mod args_test;
#[cfg(test)]
mod batch_test;
#[cfg(test)]
mod config_test;
#[cfg(test)]
mod git_test;
#[cfg(test)]
mod version_check_test;
