use unicode_normalization::UnicodeNormalization as _;

/// Tokens that spreadsheet exports (pandas, database dumps, hand-typed placeholders) use to mean
/// "no value". Compared case-insensitively after trimming.
const NULL_TOKENS: &[&str] = &["", "nan", "none", "null"];

/// Returns `true` if `value` is one of the placeholder tokens that stand for an absent value.
pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Clean a raw cell string into a record field value.
///
/// - every newline variant (`\r\n`, `\r`, `\n`) becomes a single space
/// - runs of whitespace collapse into one space and the result is trimmed
/// - placeholder tokens (`nan`, `none`, `null`, empty) become `None`
pub fn clean_text(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for part in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
    }

    if is_null_token(&out) {
        None
    } else {
        Some(out)
    }
}

/// Normalize a header label or dictionary keyword for comparison.
///
/// Labels typed by different users disagree on width (`ａ` vs `a`), case and stray spaces
/// (`案 號`). We apply Unicode NFKC, lowercase, and drop all whitespace.
pub fn normalize_label(label: &str) -> String {
    label
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_whitespace())
        .collect()
}
