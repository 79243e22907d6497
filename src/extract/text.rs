//! Small text helpers shared by the detectors.

use regex::Regex;

/// Prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_pos, _)) => &s[..byte_pos],
        None => s,
    }
}

/// Truncate to `max` characters, appending `...` only if something was cut.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    let prefix = truncate_chars(s, max);
    if prefix.len() < s.len() {
        format!("{}...", prefix)
    } else {
        prefix.to_string()
    }
}

/// Split `text` at every newline whose following text matches `marker`.
///
/// `marker` must be anchored with `^` (without multi-line mode) so it only
/// matches at the start of the remaining text. The newline itself is dropped,
/// the marker line starts the next piece.
pub fn split_before<'a>(text: &'a str, marker: &Regex) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices('\n') {
        if marker.is_match(&text[pos + 1..]) {
            pieces.push(&text[start..pos]);
            start = pos + 1;
        }
    }
    pieces.push(&text[start..]);
    pieces
}
