//! String cleanup for tag values that become path segments.

/// Keep Unicode letters and digits, spaces and underscores; drop the rest and trim trailing whitespace.
pub fn sanitize_segment(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    kept.trim_end().to_string()
}

/// Rewrite the `N/M` track convention as `N of M`.
pub fn normalize_track_number(raw: &str) -> String {
    raw.replace('/', " of ")
}
