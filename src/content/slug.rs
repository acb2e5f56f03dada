use std::sync::LazyLock;

use regex::Regex;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex is valid"));

pub const MAX_SLUG_LEN: usize = 100;

/// Generate a URL-friendly slug from a title.
///
/// Lowercases, collapses every run of non `[a-z0-9]` characters into a single
/// hyphen, trims hyphens and caps the length. Returns `untitled` when nothing
/// usable is left.
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let mut slug = NON_ALPHANUMERIC
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string();

    if slug.len() > MAX_SLUG_LEN {
        // Only ASCII remains, so byte truncation is safe.
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Pick the slug for a new or edited entity: the explicit one when given
/// (normalized), otherwise one derived from the title.
pub fn resolve_slug(explicit: Option<&str>, title: &str) -> String {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slugify(slug),
        None => slugify(title),
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
