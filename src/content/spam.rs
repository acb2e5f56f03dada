/// Keywords that hold a comment for moderation.
pub const BANNED_KEYWORDS: &[&str] = &[
    "viagra",
    "casino",
    "lottery",
    "crypto giveaway",
    "free money",
    "click here",
    "buy now",
    "work from home",
    "payday loan",
    "bitcoin doubler",
];

/// Returns the first banned keyword contained in `text`, case-insensitively.
pub fn find_banned_keyword(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    BANNED_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lowered.contains(keyword))
}
