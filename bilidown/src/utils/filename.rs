//! Filename sanitization for video titles and uploader names.
//!
//! Titles are user-supplied and frequently contain characters that are
//! invalid on Windows (`|`, `?`, `:` ...). They are replaced rather than
//! dropped so that the same title always maps to the same name, which the
//! existing-output lookup relies on. CJK text is preserved as is.

/// Characters that are invalid in Windows filenames
const WINDOWS_INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Windows reserved filenames (case-insensitive)
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Upper bound for a sanitized component, leaving room for the
/// `_<quality>_<id>.mp4.part` suffix within the usual 255-byte limit.
pub const MAX_COMPONENT_BYTES: usize = 180;

/// Sanitize a title or uploader name for use as a path component.
///
/// Control characters and Windows-invalid characters become `_` (runs
/// collapse to one), leading/trailing spaces and dots are trimmed, reserved
/// device names get a `_` prefix and overly long names are cut at a char
/// boundary. An empty result becomes `unnamed`.
///
/// ```
/// use bilidown::utils::filename::sanitize_filename;
///
/// assert_eq!(sanitize_filename("【MV】Hello | World?"), "【MV】Hello _ World_");
/// assert_eq!(sanitize_filename(""), "unnamed");
/// assert_eq!(sanitize_filename("CON"), "_CON");
/// ```
pub fn sanitize_filename(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut last_was_replacement = false;

    for c in input.chars() {
        if c.is_control() || WINDOWS_INVALID_CHARS.contains(&c) {
            if !last_was_replacement {
                result.push('_');
                last_was_replacement = true;
            }
        } else {
            result.push(c);
            last_was_replacement = false;
        }
    }

    let trimmed = truncate_to_bytes(
        result.trim_matches(|c| c == ' ' || c == '.'),
        MAX_COMPONENT_BYTES,
    )
    .trim_end_matches([' ', '.']);

    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    let upper = trimmed.to_uppercase();
    let stem = upper.split('.').next().unwrap_or(&upper);
    if WINDOWS_RESERVED_NAMES.contains(&stem) {
        return format!("_{trimmed}");
    }

    trimmed.to_string()
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char boundary.
fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
