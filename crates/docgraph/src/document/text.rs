//! Entity extraction and word-set similarity.

use std::collections::HashSet;

/// Extract entity names from text.
///
/// An entity is a whitespace-delimited token longer than three characters
/// whose first character is uppercase. Punctuation is kept as part of the
/// token. Each name appears once, in order of first occurrence.
pub fn extract_entities(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .split_whitespace()
        .filter(|word| {
            word.chars().count() > 3 && word.chars().next().is_some_and(char::is_uppercase)
        })
        .filter(|word| seen.insert(*word))
        .map(str::to_string)
        .collect()
}

/// Lowercased whitespace-delimited words of `text`.
pub fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the word sets of `a` and `b`.
///
/// Returns 0.0 if either text has no words.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}

pub(crate) fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}
