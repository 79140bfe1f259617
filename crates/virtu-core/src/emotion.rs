//! Emotion markers — `[EXPRESSION: <name>]` detection and removal.
//!
//! The model is prompted to open every reply with one marker naming an
//! avatar expression. The marker drives the avatar's pose and must never be
//! shown or spoken.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::catalog::AvatarProfile;

// First capture group is the raw identifier, surrounding blanks excluded.
static RE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\s*expression\s*:\s*([^\]]*?)\s*\]").unwrap());
// Same marker with the whitespace on both sides, for removal.
static RE_MARKER_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\[\s*expression\s*:[^\]]*\]\s*").unwrap());

/// Find the emotion named by the first marker in `text`.
///
/// Only the first marker counts: if it names an emotion the avatar does not
/// have, the result is `None` no matter what follows. Names compare
/// case-insensitively and the avatar's own spelling is returned.
pub fn parse_emotion(text: &str, profile: &AvatarProfile) -> Option<String> {
    let caps = RE_MARKER.captures(text)?;
    let wanted = caps.get(1)?.as_str().to_lowercase();
    profile
        .emotions()
        .into_iter()
        .find(|name| name.to_lowercase() == wanted)
        .map(str::to_string)
}

/// Remove every marker from `text`.
///
/// A marker and the whitespace around it collapse to a single space, or to
/// nothing at the very start of the text. Text without markers comes back
/// unchanged.
pub fn strip_markup(text: &str) -> String {
    RE_MARKER_SPAN
        .replace_all(text, |caps: &Captures<'_>| {
            if caps.get(0).is_some_and(|m| m.start() == 0) {
                ""
            } else {
                " "
            }
        })
        .into_owned()
}
