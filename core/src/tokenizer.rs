use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Alphabet: ascii lowercase letters and digits, hyphen, apostrophe, and
    // the accented Latin letters appearing in the source material.
    static ref DISALLOWED: Regex =
        Regex::new(r"[^a-z0-9\s\-'àâäéèêëïîôùûüÿæœç]").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Normalize text for indexing and querying: lowercase, map every character
/// outside the fixed alphabet to a space, collapse whitespace runs, trim.
/// Total over any input; the empty string normalizes to itself.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let substituted = DISALLOWED.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&substituted, " ").trim().to_string()
}

/// Split normalized text into tokens. Token positions are zero-based indices
/// into the returned sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }
    normalized.split(' ').map(str::to_string).collect()
}
