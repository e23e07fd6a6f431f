//! Shared utility functions

/// Safely truncate a string to at most `max_bytes` while respecting UTF-8 boundaries.
///
/// If the string is already shorter than `max_bytes`, returns it unchanged.
/// Otherwise, finds the last valid UTF-8 character boundary at or before `max_bytes`
/// and returns a slice up to that point.
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shorten card text to roughly `max_bytes`, cutting at a word boundary and
/// appending an ellipsis when anything was removed.
///
/// ```ignore
/// assert_eq!(excerpt("Join us every Sunday morning", 12), "Join us…");
/// ```
pub fn excerpt(text: &str, max_bytes: usize) -> String {
    let text = text.trim();
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let cut = truncate_utf8_safe(text, max_bytes);
    let cut = match cut.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &cut[..space],
        _ => cut,
    };
    format!("{}…", cut.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '.'))
}
