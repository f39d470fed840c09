use tracing::error;

use crate::error::GpushError;
use crate::format::ansi;
use crate::status::CommandStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub name: String,
    pub status: CommandStatus,
    pub verbose: bool,
    pub output: Vec<String>,
}

impl CommandReport {
    pub fn final_summary(&self) -> String {
        format!("{}: {}", self.name, self.status.paint(self.status.label()))
    }

    /// Buffered output is shown after the batch only for quiet commands that did not pass;
    /// verbose commands already printed every line as it happened.
    pub fn needs_output_dump(&self, batch_verbose: bool) -> bool {
        !batch_verbose && !self.verbose && !self.status.is_passing()
    }

    pub fn output_block(&self) -> Vec<String> {
        let kind = match self.status {
            CommandStatus::Fail => "failed command",
            CommandStatus::Interrupted | CommandStatus::Interrupting => "interrupted command",
            _ => "command",
        };
        let header = ansi::bold(&format!(
            "========== Output for {kind}: {} ==========",
            self.name
        ));
        let mut lines = vec![String::new(), String::new(), header];
        lines.extend(self.output.iter().cloned());
        lines.extend([String::new(), String::new()]);
        lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    NoErrors,
    Errors,
    Interrupted,
}

impl BatchOutcome {
    pub fn banner(self) -> String {
        match self {
            BatchOutcome::NoErrors => ansi::green("《 No errors detected 》"),
            BatchOutcome::Errors => ansi::red("《 Errors detected 》"),
            BatchOutcome::Interrupted => ansi::cyan("《 Interruption detected 》"),
        }
    }
}

/// Final result of a batch, in the order the commands were configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub commands: Vec<CommandReport>,
    pub success: bool,
}

impl BatchReport {
    /// Fails if any command has not reached a terminal status; that means the runner state
    /// machine is broken and the batch result cannot be trusted.
    pub fn from_commands(commands: Vec<CommandReport>) -> Result<Self, GpushError> {
        let unfinished = commands
            .iter()
            .filter(|c| !c.status.is_terminal())
            .map(|c| format!("{}={}", c.name, c.status))
            .collect::<Vec<_>>();
        if !unfinished.is_empty() {
            error!(commands = ?unfinished, "batch ended with unfinished commands");
            return Err(GpushError::Internal(format!(
                "Unexpected status found in commands: {}",
                unfinished.join(", ")
            )));
        }
        let success = commands.iter().all(|c| c.status.is_passing());
        Ok(Self { commands, success })
    }

    pub fn statuses(&self) -> Vec<CommandStatus> {
        self.commands.iter().map(|c| c.status).collect()
    }

    pub fn status_of(&self, name: &str) -> Option<CommandStatus> {
        self.commands
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.status)
    }

    /// Interruption wins over plain failure.
    pub fn outcome(&self) -> BatchOutcome {
        let any = |status: CommandStatus| self.commands.iter().any(|c| c.status == status);
        if any(CommandStatus::Interrupted) {
            BatchOutcome::Interrupted
        } else if any(CommandStatus::Fail) {
            BatchOutcome::Errors
        } else {
            BatchOutcome::NoErrors
        }
    }
}
