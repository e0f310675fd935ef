//! Fixed-window text splitting.
//!
//! Splits over-long fields into windows of `window` characters with
//! `window - overlap` step, capped at `max_chunks` windows so a record's
//! chunk count stays bounded regardless of field length.

/// Split `text` into fixed windows. Returns a single element when the text
/// already fits. Operates on characters so multi-byte content splits safely.
pub fn fixed_windows(
    text: &str,
    window: usize,
    overlap: usize,
    max_chunks: usize,
) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= window {
        return vec![text.to_string()];
    }

    // Invariant from config validation: overlap < window.
    let step = window.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() && windows.len() < max_chunks {
        let end = (start + window).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}

/// Truncate `text` to at most `max_chars` characters, appending a marker
/// when content was dropped.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}
