// Output formatting: chart data, terminal rendering, and JSON reports.

pub mod chart;
pub mod report;
pub mod terminal;

/// Shorten `text` to `max_chars` characters for a fixed-width column,
/// marking the cut with "...". Counts chars, not bytes.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
