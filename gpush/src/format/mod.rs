pub mod ansi;
pub mod terminal;
