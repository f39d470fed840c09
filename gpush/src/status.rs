use crate::format::ansi;

pub const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Lifecycle of a single command. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    NotStarted,
    Working,
    Success,
    Fail,
    Skipped,
    Interrupting,
    Interrupted,
}

impl CommandStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            CommandStatus::Success
            | CommandStatus::Fail
            | CommandStatus::Skipped
            | CommandStatus::Interrupted => true,
            CommandStatus::NotStarted | CommandStatus::Working | CommandStatus::Interrupting => {
                false
            }
        }
    }

    /// Success and Skipped both count as a passing command.
    pub fn is_passing(self) -> bool {
        match self {
            CommandStatus::Success | CommandStatus::Skipped => true,
            CommandStatus::NotStarted
            | CommandStatus::Working
            | CommandStatus::Fail
            | CommandStatus::Interrupting
            | CommandStatus::Interrupted => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CommandStatus::NotStarted => "NOT STARTED",
            CommandStatus::Working => "WORKING",
            CommandStatus::Success => "SUCCESS",
            CommandStatus::Fail => "FAIL",
            CommandStatus::Skipped => "SKIPPED",
            CommandStatus::Interrupting => "INTERRUPTING",
            CommandStatus::Interrupted => "INTERRUPTED",
        }
    }

    pub fn glyph(self, verbose: bool, output_lines: usize) -> &'static str {
        match self {
            CommandStatus::Success => "✓",
            CommandStatus::Fail => "✗",
            CommandStatus::Skipped => "⏭",
            CommandStatus::Interrupted => "⏸",
            CommandStatus::Interrupting => "⏳",
            CommandStatus::Working if verbose => "…",
            CommandStatus::Working | CommandStatus::NotStarted => {
                SPINNER_FRAMES[output_lines % SPINNER_FRAMES.len()]
            }
        }
    }

    pub fn paint(self, text: &str) -> String {
        match self {
            CommandStatus::Success => ansi::green(text),
            CommandStatus::Fail => ansi::red(text),
            CommandStatus::Skipped => ansi::yellow(text),
            CommandStatus::Interrupting | CommandStatus::Interrupted => ansi::cyan(text),
            CommandStatus::NotStarted | CommandStatus::Working => ansi::white(text),
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
