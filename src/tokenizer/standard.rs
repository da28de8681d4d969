use crate::document::{Token, TokenKind};
use regex::Regex;
use std::sync::LazyLock;

/// Characters classified as punctuation by every backend.
pub const PUNCTUATION: &str = concat!(
    ".,;:!?¡¿\"'`()[]{}<>«»‹›“”„‘’‚—–‐‑-…·•/\\|*&%$#@~^_=+",
    "。、，．！？；：「」『』（）《》〈〉【】〔〕［］｛｝〖〗・‥〜～＂＇｀｜",
);

const LINE_BREAKS: &str = "\n\r\u{2028}\u{2029}";

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let punct: String = PUNCTUATION.chars().map(|c| regex::escape(&c.to_string())).collect();
    let pattern = format!(r"[\n\r\x{{2028}}\x{{2029}}]+|[{punct}]+|[^\s{punct}]+");
    Regex::new(&pattern).expect("Failed to compile token pattern")
});

pub(crate) static LINE_BREAK_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\n\r\x{2028}\x{2029}]+").expect("Failed to compile line break pattern")
});

pub fn is_line_break(c: char) -> bool {
    LINE_BREAKS.contains(c)
}

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(c)
}

/// Three-way classification of a unit produced by any backend.
/// Returns `None` for whitespace, which never becomes a token.
pub fn classify(unit: &str) -> Option<TokenKind> {
    if unit.trim().is_empty() && !unit.chars().any(is_line_break) {
        return None;
    }
    if unit.chars().all(is_line_break) {
        Some(TokenKind::ParagraphBreak)
    } else if unit.chars().all(is_punctuation) {
        Some(TokenKind::Punctuation)
    } else {
        Some(TokenKind::Word)
    }
}

/// Tokenizer for space-delimited scripts: one regex pass over the text,
/// each match a maximal run of a single class.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardTokenizer;

impl StandardTokenizer {
    /// Tokens paired with their byte offset in `text`.
    pub fn tokenize_with_offsets(&self, text: &str) -> Vec<(usize, Token)> {
        TOKEN_PATTERN
            .find_iter(text)
            .filter_map(|m| {
                let kind = classify(m.as_str())?;
                Some((m.start(), kind, m.as_str()))
            })
            .enumerate()
            .map(|(ordinal, (offset, kind, text))| (offset, Token::new(ordinal as u64, kind, text)))
            .collect()
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenize_with_offsets(text)
            .into_iter()
            .map(|(_, token)| token)
            .collect()
    }
}
