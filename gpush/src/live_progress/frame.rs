use std::io::Write;

use unicode_width::UnicodeWidthChar;

use crate::format::terminal::display_width;
use crate::status::CommandStatus;

/// Snapshot of one command as the status line needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSegment {
    pub name: String,
    pub status: CommandStatus,
    pub verbose: bool,
    pub output_lines: usize,
}

impl StatusSegment {
    fn glyph(&self) -> &'static str {
        self.status.glyph(self.verbose, self.output_lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SegmentLayout {
    brackets: bool,
    squeeze_name: bool,
    trailing_spaces: usize,
}

/// Each rung is tried in order until the line fits; the last one is followed by truncation.
const LAYOUT_LADDER: [SegmentLayout; 4] = [
    SegmentLayout {
        brackets: true,
        squeeze_name: false,
        trailing_spaces: 2,
    },
    SegmentLayout {
        brackets: true,
        squeeze_name: false,
        trailing_spaces: 1,
    },
    SegmentLayout {
        brackets: true,
        squeeze_name: true,
        trailing_spaces: 1,
    },
    SegmentLayout {
        brackets: false,
        squeeze_name: true,
        trailing_spaces: 1,
    },
];

const ELLIPSIS: &str = "... ";

fn render_segment(segment: &StatusSegment, layout: SegmentLayout) -> String {
    let name = if layout.squeeze_name {
        segment.name.split_whitespace().collect::<String>()
    } else {
        segment.name.clone()
    };
    let glyph = segment.glyph();
    let padding = " ".repeat(layout.trailing_spaces);
    if layout.brackets {
        format!("[{glyph}]{name}{padding}")
    } else {
        format!("{glyph}{name}{padding}")
    }
}

fn total_width(texts: &[String]) -> usize {
    texts.iter().map(|t| display_width(t)).sum()
}

fn take_columns(text: &str, columns: usize) -> String {
    let mut used = 0usize;
    text.chars()
        .take_while(|ch| {
            used += ch.width().unwrap_or(0);
            used <= columns
        })
        .collect()
}

fn truncate_to_width(text: &str, budget: usize) -> String {
    if display_width(text) <= budget {
        return text.to_string();
    }
    if budget < ELLIPSIS.len() {
        return take_columns(text, budget);
    }
    format!("{}{ELLIPSIS}", take_columns(text, budget - ELLIPSIS.len()))
}

/// Plain-text segments for one status line no wider than `columns`.
pub fn fit_segments(segments: &[StatusSegment], columns: usize) -> Vec<String> {
    if segments.is_empty() {
        return vec![];
    }
    let mut last = vec![];
    for layout in LAYOUT_LADDER {
        last = segments
            .iter()
            .map(|segment| render_segment(segment, layout))
            .collect::<Vec<_>>();
        if total_width(&last) <= columns {
            return last;
        }
    }
    let budget = columns / segments.len();
    last.iter()
        .map(|text| truncate_to_width(text, budget))
        .collect()
}

/// The coloured status line for `segments`.
pub fn render_status_line(segments: &[StatusSegment], columns: usize) -> String {
    fit_segments(segments, columns)
        .iter()
        .zip(segments)
        .map(|(text, segment)| segment.status.paint(text))
        .collect()
}

pub fn frame_physical_line_count(frame: &str, columns: usize) -> usize {
    let width = columns.max(1);
    frame
        .split('\n')
        .map(|line| display_width(line).div_ceil(width).max(1))
        .sum::<usize>()
        .max(1)
}

pub(super) fn clear_previous_frame(out: &mut dyn Write, lines: usize) {
    if lines == 0 {
        return;
    }
    let _ = out.write_all("\u{1b}[2K\r".as_bytes());
    for _ in 1..lines {
        let _ = out.write_all("\u{1b}[1A\u{1b}[2K\r".as_bytes());
    }
}
