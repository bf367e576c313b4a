//! Term Extraction
//!
//! Turns free text into normalized terms for lexical scoring: lowercase
//! alphanumeric words, stop-words dropped, light suffix stemming so that
//! "refactoring"/"refactor" and "components"/"component" meet.

use std::collections::BTreeSet;

const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "by", "can", "do", "for",
    "from", "help", "how", "i", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or",
    "our", "please", "should", "so", "that", "the", "these", "this", "those", "to", "use",
    "using", "we", "what", "when", "which", "while", "with", "you", "your",
];

/// Extract ordered terms (duplicates preserved) from `text`.
pub fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() >= 2)
        .map(|s| s.to_lowercase())
        .filter(|s| !STOP_WORDS.contains(&s.as_str()))
        .map(|s| stem(&s))
        .collect()
}

/// Extract the distinct terms of `text`.
pub fn term_set(text: &str) -> BTreeSet<String> {
    terms(text).into_iter().collect()
}

/// Adjacent term pairs, used for phrase bonuses.
pub fn bigrams(terms: &[String]) -> BTreeSet<(String, String)> {
    terms
        .windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect()
}

/// Strip the most common English inflection suffixes.
///
/// "-ing"/"-ed" are only removed when a vowel survives in the stem, and a
/// trailing silent "e" is dropped, so "style", "styled" and "styling" meet
/// while "string" stays whole.
pub fn stem(word: &str) -> String {
    if !word.is_ascii() {
        return word.to_string();
    }
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if let Some(base) = strip_verb_suffix(word) {
        return base;
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return strip_silent_e(&word[..word.len() - 1]);
    }
    strip_silent_e(word)
}

fn strip_verb_suffix(word: &str) -> Option<String> {
    let base = if word.len() > 5 && word.ends_with("ing") {
        &word[..word.len() - 3]
    } else if word.len() > 4 && word.ends_with("ed") && !word.ends_with("eed") {
        &word[..word.len() - 2]
    } else {
        return None;
    };
    if base.len() < 3 || !has_vowel(base) {
        return None;
    }

    // mapped -> map, but installed -> install
    let bytes = base.as_bytes();
    let last = bytes[bytes.len() - 1];
    if last == bytes[bytes.len() - 2] && !is_vowel(last) && !b"lsz".contains(&last) {
        return Some(base[..base.len() - 1].to_string());
    }
    Some(base.to_string())
}

fn strip_silent_e(word: &str) -> String {
    if word.len() > 3 && word.ends_with('e') && !word.ends_with("ee") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

fn is_vowel(b: u8) -> bool {
    b"aeiouy".contains(&b)
}

fn has_vowel(s: &str) -> bool {
    s.bytes().any(is_vowel)
}
