use std::io::IsTerminal;

use terminal_size::{Width, terminal_size_of};
use unicode_width::UnicodeWidthStr;

const FALLBACK_COLUMNS: usize = 80;

pub fn is_output_terminal() -> bool {
    std::io::stdout().is_terminal() || std::io::stderr().is_terminal()
}

pub fn terminal_columns() -> usize {
    let stdout = std::io::stdout();
    let detected = stdout
        .is_terminal()
        .then(|| terminal_size_of(stdout).map(|(Width(w), _)| usize::from(w)))
        .flatten();
    detected
        .filter(|columns| *columns > 0)
        .or_else(|| {
            std::env::var("COLUMNS")
                .ok()
                .and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|columns| *columns > 0)
        })
        .unwrap_or(FALLBACK_COLUMNS)
}

/// Columns occupied by `text` once printed, ignoring ANSI escapes.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(super::ansi::strip(text).as_str())
}
