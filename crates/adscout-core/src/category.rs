//! Publisher category parsing and allow-list matching.

/// Separator glyphs between category parts, e.g. `"Fashion · Retail"`.
const CATEGORY_SEPARATORS: &[char] = &['\u{00B7}', '\u{2022}', '|', ',', '/'];

/// Splits a raw category text into trimmed, non-empty parts.
#[must_use]
pub fn split_category(raw: &str) -> Vec<String> {
    raw.split(CATEGORY_SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns `true` if any part of `category` exactly equals an allow-list entry.
///
/// An empty allow-list matches everything. Comparison is case-sensitive:
/// `"Fashion · Retail"` matches `["Retail"]` but not `["retail"]`.
#[must_use]
pub fn category_matches<S: AsRef<str>>(category: &str, allow_list: &[S]) -> bool {
    if allow_list.is_empty() {
        return true;
    }
    split_category(category)
        .iter()
        .any(|part| allow_list.iter().any(|entry| entry.as_ref() == part))
}
