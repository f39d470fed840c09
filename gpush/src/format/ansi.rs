use once_cell::sync::Lazy;

static USE_COLOR: Lazy<bool> = Lazy::new(use_color);

fn use_color() -> bool {
    let no_color = std::env::var("NO_COLOR")
        .ok()
        .is_some_and(|value| !value.trim().is_empty());
    if no_color {
        return false;
    }

    let force_color = match std::env::var("FORCE_COLOR")
        .ok()
        .map(|s| s.trim().to_string())
    {
        None => None,
        Some(force_value) if force_value.is_empty() => None,
        Some(force_value) if force_value == "0" => Some(false),
        Some(_) => Some(true),
    };

    let is_dumb_term = std::env::var("TERM")
        .ok()
        .is_some_and(|value| value.trim() == "dumb");
    if is_dumb_term && force_color != Some(true) {
        return false;
    }

    force_color.unwrap_or_else(super::terminal::is_output_terminal)
}

pub fn colors_enabled() -> bool {
    *USE_COLOR
}

fn wrap(open: &str, close: &str, text: &str) -> String {
    if !colors_enabled() {
        return text.to_string();
    }
    format!("\u{1b}[{open}m{text}\u{1b}[{close}m")
}

pub fn bold(text: &str) -> String {
    wrap("1", "22", text)
}

pub fn red(text: &str) -> String {
    wrap("31", "39", text)
}

pub fn yellow(text: &str) -> String {
    wrap("33", "39", text)
}

pub fn green(text: &str) -> String {
    wrap("32", "39", text)
}

pub fn cyan(text: &str) -> String {
    wrap("36", "39", text)
}

pub fn white(text: &str) -> String {
    wrap("37", "39", text)
}

pub fn strip(text: &str) -> String {
    let stripped_bytes = strip_ansi_escapes::strip(text.as_bytes());
    String::from_utf8(stripped_bytes).unwrap_or_else(|_| text.to_string())
}
