//! Folder-name sanitization.
//!
//! Names must be valid on every desktop filesystem the case data may be synced to, so the
//! Windows rules are applied everywhere.

/// Characters no Windows file name may contain.
pub const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replacement for names that sanitize to nothing.
pub const FALLBACK_NAME: &str = "unnamed";

/// Smallest accepted length cap; smaller caps are raised to this.
pub const MIN_NAME_LEN: usize = 8;

const DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turn arbitrary text into a single safe path component of at most `max_len` characters.
///
/// Idempotent: `sanitize(&sanitize(s, n), n) == sanitize(s, n)`.
pub fn sanitize(name: &str, max_len: usize) -> String {
    let max_len = max_len.max(MIN_NAME_LEN);
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut out = trim_name(&truncate_chars(trim_name(&replaced), max_len)).to_string();
    if out.is_empty() {
        out = FALLBACK_NAME.to_string();
    }
    if is_device_name(&out) {
        out = format!("_{out}");
        out = trim_name(&truncate_chars(&out, max_len)).to_string();
    }
    out
}

/// Leaf folder name for a case: `<case_id>_<client>`, or the client alone when no id is assigned.
///
/// When the name exceeds `max_len` the client part is shortened first so the case-id prefix
/// survives.
pub fn folder_name(case_id: &str, client: &str, max_len: usize) -> String {
    let max_len = max_len.max(MIN_NAME_LEN);
    let client = sanitize(client, max_len);
    if case_id.trim().is_empty() {
        return client;
    }

    let id = sanitize(case_id, max_len);
    let room = max_len.saturating_sub(id.chars().count() + 1);
    let client_part = trim_name(&truncate_chars(&client, room)).to_string();
    if client_part.is_empty() {
        // The id alone fills the budget.
        return sanitize(&format!("{id}_{client}"), max_len);
    }
    format!("{id}_{client_part}")
}

fn trim_name(name: &str) -> &str {
    name.trim()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

fn truncate_chars(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

fn is_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
}
