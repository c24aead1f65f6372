//! Filesystem-safe artifact names derived from video titles.

const INVALID_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Longest name, in characters, a sanitized title may have.
pub const MAX_NAME_CHARS: usize = 200;

/// Strips path and shell-hostile characters, caps the length and trims.
///
/// Idempotent: feeding the output back in returns it unchanged.
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !INVALID_CHARS.contains(c))
        .take(MAX_NAME_CHARS)
        .collect();
    stripped.trim().to_string()
}

/// Sanitized title, or the fallback when nothing usable is left.
pub fn safe_name(title: &str, fallback: &str) -> String {
    let sanitized = sanitize_filename(title);
    if sanitized.is_empty() {
        sanitize_filename(fallback)
    } else {
        sanitized
    }
}
