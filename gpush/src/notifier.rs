//! Desktop feedback when a run ends: an optional sound through `afplay` and a
//! `terminal-notifier` banner on macOS.
//!
//! `GPUSH_SOUND_SUCCESS` / `GPUSH_SOUND_FAIL` point at sound files to play.
//! `GPUSH_NO_NOTIFIER` (any value) turns the banner off.

use std::path::PathBuf;

use duct::cmd as duct_cmd;
use tracing::debug;
use which::which;

pub const NOTIFICATION_TITLE: &str = "GPush Build";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subtitle: String,
    pub message: String,
    pub sound: &'static str,
}

pub fn notification(success: bool, message: &str) -> Notification {
    let (subtitle, sound, emojis) = if success {
        ("Success", "Hero", "🥳🎉🍾")
    } else {
        ("Fail", "Basso", "🤨💩🙈")
    };
    Notification {
        subtitle: format!("{emojis} {subtitle} {emojis}"),
        message: message.to_string(),
        sound,
    }
}

fn sound_file(success: bool) -> Option<PathBuf> {
    let key = if success {
        "GPUSH_SOUND_SUCCESS"
    } else {
        "GPUSH_SOUND_FAIL"
    };
    std::env::var_os(key)
        .map(PathBuf::from)
        .filter(|path| path.is_file())
}

fn play_sound(success: bool) {
    let (Some(sound), Ok(player)) = (sound_file(success), which("afplay")) else {
        return;
    };
    // Played in the background; the handle is dropped without waiting.
    if let Err(err) = duct_cmd(player, [sound]).stdout_null().stderr_null().start() {
        debug!(error = %err, "could not play sound");
    }
}

fn post_notification(success: bool, message: &str) {
    if std::env::var_os("GPUSH_NO_NOTIFIER").is_some() {
        return;
    }
    let Ok(notifier) = which("terminal-notifier") else {
        return;
    };
    let note = notification(success, message);
    let result = duct_cmd(
        notifier,
        [
            "-title",
            NOTIFICATION_TITLE,
            "-subtitle",
            note.subtitle.as_str(),
            "-message",
            note.message.as_str(),
            "-sound",
            note.sound,
            "-sender",
            "com.apple.terminal",
        ],
    )
    .stdout_null()
    .stderr_null()
    .unchecked()
    .run();
    if let Err(err) = result {
        debug!(error = %err, "terminal-notifier failed");
    }
}

pub fn notify(success: bool, message: &str) {
    play_sound(success);
    post_notification(success, message);
}
