//! Text normalisation, tokenisation, stemming and sentence splitting.

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]+").expect("valid regex"));
static TFIDF_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?]+["')\]]*\s+"#).expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("valid regex"));
static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// English stop words (NLTK list).
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "couldn", "d", "did", "didn", "do", "does", "doesn", "doing",
    "don", "down", "during", "each", "few", "for", "from", "further", "had", "hadn", "has",
    "hasn", "have", "haven", "having", "he", "her", "here", "hers", "herself", "him", "himself",
    "his", "how", "i", "if", "in", "into", "is", "isn", "it", "its", "itself", "just", "ll", "m",
    "ma", "me", "mightn", "more", "most", "mustn", "my", "myself", "needn", "no", "nor", "not",
    "now", "o", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
    "out", "over", "own", "re", "s", "same", "shan", "she", "should", "shouldn", "so", "some",
    "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "ve",
    "very", "was", "wasn", "we", "were", "weren", "what", "when", "where", "which", "while",
    "who", "whom", "why", "will", "with", "won", "wouldn", "y", "you", "your", "yours",
    "yourself", "yourselves",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

pub fn is_stop_word(word: &str) -> bool {
    STOP_SET.contains(word)
}

/// NFKC, control characters dropped, runs of spaces collapsed, line
/// structure (including blank lines) kept.
pub fn clean_text(raw: &str) -> String {
    let normalized: String = raw
        .nfkc()
        .filter(|&ch| ch == '\n' || ch == '\t' || !ch.is_control())
        .collect();
    let mut out = Vec::new();
    for line in normalized.lines() {
        out.push(line.split_whitespace().collect::<Vec<_>>().join(" "));
    }
    out.join("\n").trim().to_string()
}

/// Collapses all whitespace, newlines included, into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINES
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

pub fn stem(word: &str) -> String {
    STEMMER.stem(word).into_owned()
}

/// Stemmed content words in text order: alphabetic, longer than two
/// characters, not stop words.
pub fn content_stems(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| w.len() > 2 && !is_stop_word(w))
        .map(stem)
        .collect()
}

/// The `top_k` most frequent stems; ties keep first-occurrence order.
pub fn keywords(text: &str, top_k: usize) -> Vec<String> {
    let stems = content_stems(text);
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, s) in stems.iter().enumerate() {
        counts.entry(s.as_str()).or_insert((0, i)).0 += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(s, (n, first))| (s, n, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(top_k)
        .map(|(s, _, _)| s.to_string())
        .collect()
}

pub fn keyword_set(text: &str, top_k: usize) -> HashSet<String> {
    keywords(text, top_k).into_iter().collect()
}

/// Lowercased `\b\w\w+\b` tokens with stop words removed.
pub fn tfidf_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TFIDF_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

pub fn sentences(text: &str) -> Vec<String> {
    let flat = collapse_whitespace(text);
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(&flat) {
        let s = flat[start..m.end()].trim();
        if !s.is_empty() {
            out.push(s.to_string());
        }
        start = m.end();
    }
    let rest = flat[start..].trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_keeps_blank_lines() {
        let cleaned = clean_text("Title\u{0002}  here\r\n\r\nBody   text\n");
        assert_eq!(cleaned, "Title here\n\nBody text");
    }

    #[test]
    fn clean_text_applies_nfkc() {
        assert_eq!(clean_text("ﬁllable"), "fillable");
    }

    #[test]
    fn keywords_are_stemmed_and_ranked() {
        let kws = keywords("Forms, forms and more forms. Fillable form fields.", 2);
        assert_eq!(kws[0], "form");
        assert_eq!(kws.len(), 2);
        assert!(!kws.iter().any(|k| k == "and"));
    }

    #[test]
    fn keywords_of_only_stop_words_is_empty() {
        assert!(keywords("the and of to it", 10).is_empty());
    }

    #[test]
    fn sentence_split() {
        let s = sentences("One thing. Two things!  Three? Four");
        assert_eq!(s, vec!["One thing.", "Two things!", "Three?", "Four"]);
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let p = paragraphs("a b\nc\n\n  \nd e\n\nf");
        assert_eq!(p, vec!["a b\nc", "d e", "f"]);
    }

    #[test]
    fn tfidf_tokens_drop_short_and_stop_words() {
        assert_eq!(tfidf_tokens("A form is in the PDF"), vec!["form", "pdf"]);
    }
}
