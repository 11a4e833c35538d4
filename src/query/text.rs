//! Case-insensitive matching and snippet extraction over Unicode text.

/// Find `needle` in `haystack` ignoring case.
///
/// Returns the matched range as char indices into `haystack`, end exclusive.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Some((0, 0));
    }

    // Each lowered char remembers which original char produced it.
    let lowered: Vec<(char, usize)> = haystack
        .chars()
        .enumerate()
        .flat_map(|(i, c)| c.to_lowercase().map(move |l| (l, i)))
        .collect();

    lowered
        .windows(needle.len())
        .find(|window| window.iter().map(|(c, _)| c).eq(needle.iter()))
        .map(|window| (window[0].1, window[window.len() - 1].1 + 1))
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    find_ignore_case(haystack, needle).is_some()
}

/// At most `max_chars` of `text`, centred on the char range `start..end` when it must be cut.
pub fn snippet(text: &str, start: usize, end: usize, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.trim().to_string();
    }

    let match_len = end.saturating_sub(start);
    let from = if match_len >= max_chars {
        start
    } else {
        let context = (max_chars - match_len) / 2;
        let from = start.saturating_sub(context);
        from.min(chars.len() - max_chars)
    };
    let to = (from + max_chars).min(chars.len());

    chars[from..to].iter().collect::<String>().trim().to_string()
}
