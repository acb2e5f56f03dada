/// Average reading speed used for `read_time`.
pub const WORDS_PER_MINUTE: usize = 200;

/// Sanitize rich HTML authored in the admin panel (scripts, event handlers
/// and unknown tags are removed).
pub fn sanitize_html(raw: &str) -> String {
    ammonia::clean(raw)
}

/// Strip every tag, keeping only the text content.
///
/// Entities in the output stay escaped, so the result is safe to embed in HTML.
pub fn strip_tags(raw: &str) -> String {
    ammonia::Builder::empty().clean(raw).to_string()
}

pub fn word_count(html: &str) -> usize {
    strip_tags(html).split_whitespace().count()
}

/// Estimated reading time in whole minutes, never less than one.
pub fn read_time_minutes(html: &str) -> i32 {
    let words = word_count(html);
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Plain-text excerpt of at most `max_chars` characters, cut on a word
/// boundary with a trailing ellipsis when shortened.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = strip_tags(html)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if text.chars().count() <= max_chars {
        return text;
    }

    let cut: String = text.chars().take(max_chars).collect();
    let on_boundary = text.chars().nth(max_chars) == Some(' ');
    let trimmed = match cut.rfind(' ') {
        _ if on_boundary => cut.as_str(),
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end())
}
