/// Splits command text on runs of whitespace.
///
/// Blank input yields no tokens at all, so callers can test for "no command" with
/// `is_empty()`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_owned).collect()
}
