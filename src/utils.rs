use std::fs::DirBuilder;
use std::path::Path;
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref STOP_WORDS: FxHashSet<&'static str> = {
        let words = vec![
            "a", "about", "after", "all", "also", "an", "and", "any", "are", "as",
            "at", "be", "because", "been", "but", "by", "can", "could", "do", "does",
            "for", "from", "had", "has", "have", "he", "her", "his", "how", "i",
            "if", "in", "into", "is", "it", "its", "just", "me", "more", "my",
            "no", "not", "of", "on", "or", "our", "she", "so", "such", "than",
            "that", "the", "their", "them", "then", "there", "these", "they", "this",
            "to", "was", "we", "were", "what", "when", "which", "who", "will",
            "with", "would", "you", "your",
        ];
        words.into_iter().collect()
    };
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("static regex");
}

/// Creates a directory if it doesn't exist
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .create(path)?;
    Ok(())
}

/// Lowercased, NFC-normalized words with punctuation, stop words and
/// single characters removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.nfc().collect::<String>().to_lowercase();
    let text = NON_WORD.replace_all(&text, " ");

    text.split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .filter(|token| !STOP_WORDS.contains(*token))
        .map(|token| token.to_string())
        .collect()
}

/// Word counts sorted by descending frequency, ties broken alphabetically.
pub fn word_frequencies(text: &str) -> Vec<(String, usize)> {
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut frequencies: Vec<(String, usize)> = counts.into_iter().collect();
    frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    frequencies
}
