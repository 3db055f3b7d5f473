//! Text normalization and validation for extracted résumé text.
//!
//! `clean` must be idempotent: running it twice yields the same output.
//! The AI prompt depends on this; re-cleaning persisted text on a manual
//! re-parse must not drift.

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum characters for a parseable résumé.
pub const MIN_TEXT_CHARS: usize = 100;
/// Minimum whitespace-separated words for a parseable résumé.
pub const MIN_TEXT_WORDS: usize = 50;
/// Upper bound guarding AI cost and latency.
pub const MAX_TEXT_CHARS: usize = 50_000;

static BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[•◦▪‣·∙●○■□◆▸►»※★☆✓✔➤➢]").expect("bullet pattern"));

// Latin letters, Vietnamese diacritics, digits, and résumé punctuation.
// Everything else (emoji, CJK, control glyphs) becomes a space.
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^A-Za-z0-9À-ỹ\s.,;:()/%+#&@'"-]"#).expect("charset pattern"));

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n+\s*").expect("newline pattern"));

static DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(?:\s*\.)+").expect("dot-run pattern"));

static PUNCT_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([,;:])(?:\s*[,;:])+").expect("punct-run pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Deterministic normalization of raw extracted text.
pub fn clean(text: &str) -> String {
    let t = BULLETS.replace_all(text, " ");
    let t = DISALLOWED.replace_all(&t, " ");
    // Line breaks terminate sentences so the AI sees prose, not layout.
    let t = LINE_BREAKS.replace_all(&t, ". ");
    let t = DOT_RUNS.replace_all(&t, ".");
    let t = PUNCT_RUNS.replace_all(&t, "$1");
    let t = WHITESPACE.replace_all(&t, " ");
    t.trim()
        .trim_start_matches(|c: char| c == '.' || c == ' ')
        .to_string()
}

/// Outcome of validating extracted text before it is sent to the AI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextValidation {
    pub valid: bool,
    pub reason: Option<String>,
}

impl TextValidation {
    fn ok() -> Self {
        TextValidation {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: &str) -> Self {
        TextValidation {
            valid: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Rejects text too sparse to parse reliably or too long to send upstream.
/// No AI call is made for rejected text.
pub fn validate_extracted_text(text: &str) -> TextValidation {
    let chars = text.chars().count();
    if chars < MIN_TEXT_CHARS {
        return TextValidation::rejected("Text too short (< 100 characters)");
    }
    if text.split_whitespace().count() < MIN_TEXT_WORDS {
        return TextValidation::rejected("Not enough words (< 50)");
    }
    if chars > MAX_TEXT_CHARS {
        return TextValidation::rejected("Text too long (> 50000 characters)");
    }
    TextValidation::ok()
}
