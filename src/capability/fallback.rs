//! Deterministic rule-based text processing used when no engine could be
//! constructed. Also usable directly as plain utilities.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Fragments of this many characters or fewer are not treated as sentences.
const MIN_SENTENCE_CHARS: usize = 10;
const SUMMARY_SENTENCES: usize = 2;

static LONE_I: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bi\b").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SENTENCE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s*([a-z])").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static FILLER_WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bvery\s+").unwrap());
static INFORMAL_WORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\bkinda\b").unwrap(), "somewhat"),
        (Regex::new(r"(?i)\bgonna\b").unwrap(), "going to"),
        (Regex::new(r"(?i)\bwanna\b").unwrap(), "want to"),
    ]
});

/// Rules run in a fixed order: lone `i`, whitespace collapse, sentence-start
/// capitalization, trim, first-character capitalization.
pub fn correct_grammar(text: &str) -> String {
    let corrected = LONE_I.replace_all(text, "I");
    let corrected = WHITESPACE_RUN.replace_all(&corrected, " ");
    let corrected = SENTENCE_START.replace_all(&corrected, |caps: &Captures| {
        format!("{} {}", &caps[1], caps[2].to_uppercase())
    });

    capitalize_first(corrected.trim())
}

/// First two sentences of meaningful length, terminated with a period. Text
/// without any such sentence is returned trimmed (and terminated if non-empty).
pub fn summarize(text: &str) -> String {
    let sentences: Vec<&str> = SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|fragment| fragment.chars().count() > MIN_SENTENCE_CHARS)
        .take(SUMMARY_SENTENCES)
        .collect();

    let summary = if sentences.is_empty() {
        text.trim().to_string()
    } else {
        sentences.join(". ")
    };

    if summary.is_empty() || summary.ends_with('.') {
        summary
    } else {
        format!("{summary}.")
    }
}

pub fn improve(text: &str) -> String {
    let corrected = correct_grammar(text);
    let mut improved = FILLER_WORDS.replace_all(&corrected, "").into_owned();
    for (pattern, replacement) in INFORMAL_WORDS.iter() {
        improved = pattern.replace_all(&improved, *replacement).into_owned();
    }
    improved
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
