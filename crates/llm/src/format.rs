//! Cleanup of raw completion text.

/// Split a multi-sentence completion into one entry per line.
///
/// A line that starts with a digit and contains `". "` loses everything up to
/// and including the first `". "` (`"2. Foo"` becomes `"Foo"`). Leading `-` or
/// `*` bullets are dropped, lines are trimmed and empty lines skipped.
pub fn parse_multiline(response: &str) -> Vec<String> {
    response
        .split('\n')
        .map(strip_numbering)
        .map(strip_bullet)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim a single-sentence completion and any surrounding quote characters.
pub fn clean_sentence(response: &str) -> String {
    response
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

fn strip_numbering(line: &str) -> &str {
    let starts_with_digit = line.chars().next().is_some_and(|c| c.is_ascii_digit());
    if !starts_with_digit {
        return line;
    }
    match line.split_once(". ") {
        Some((_, rest)) => rest,
        None => line,
    }
}

fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('-').or_else(|| trimmed.strip_prefix('*')) {
        Some(rest) => rest,
        None => line,
    }
}
