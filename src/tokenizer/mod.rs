//! Language-aware tokenization.
//!
//! A language code maps to one of a closed set of backends. Space-delimited
//! scripts go through [`StandardTokenizer`]; scripts without word spacing are
//! split by a [`Segmenter`] and the units are reclassified with the same
//! three-way rule, so word counts mean the same thing for every language.

pub mod segmenter;
pub mod standard;

pub use segmenter::{
    Segmenter, SegmenterCache, SegmenterProvider, UnicodeWordProvider, UnicodeWordSegmenter,
};
pub use standard::StandardTokenizer;

use crate::document::{Token, TokenKind};
use crate::error::TokenizeError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Han,
    Japanese,
    Thai,
    Lao,
    Khmer,
    Burmese,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Standard,
    Dictionary(Script),
}

impl Backend {
    /// Whether rendered text separates words with spaces.
    pub fn is_space_delimited(&self) -> bool {
        matches!(self, Backend::Standard)
    }
}

/// BCP 47-ish language tag such as `en`, `zh-Hant` or `ja_JP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased primary subtag (`zh` for `zh-Hant-TW`).
    pub fn primary_subtag(&self) -> String {
        self.0
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    pub fn backend(&self) -> Backend {
        backend_for(self)
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn backend_for(language: &LanguageCode) -> Backend {
    match language.primary_subtag().as_str() {
        "zh" | "yue" | "wuu" | "cmn" => Backend::Dictionary(Script::Han),
        "ja" => Backend::Dictionary(Script::Japanese),
        "th" => Backend::Dictionary(Script::Thai),
        "lo" => Backend::Dictionary(Script::Lao),
        "km" => Backend::Dictionary(Script::Khmer),
        "my" => Backend::Dictionary(Script::Burmese),
        _ => Backend::Standard,
    }
}

/// Token paired with its byte offset in the tokenized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken {
    pub offset: usize,
    pub token: Token,
}

/// Entry point for tokenization. Owns the segmenter cache, so one instance
/// should live for the whole session.
pub struct Tokenizer {
    segmenters: SegmenterCache,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Arc::new(UnicodeWordProvider))
    }
}

impl Tokenizer {
    pub fn new(provider: Arc<dyn SegmenterProvider>) -> Self {
        Self {
            segmenters: SegmenterCache::new(provider),
        }
    }

    pub fn segmenters(&self) -> &SegmenterCache {
        &self.segmenters
    }

    /// Tokenize `text`; ordinals start at 0.
    pub fn tokenize(&self, text: &str, language: &LanguageCode) -> Result<Vec<Token>, TokenizeError> {
        Ok(self
            .tokenize_with_offsets(text, language)?
            .into_iter()
            .map(|positioned| positioned.token)
            .collect())
    }

    pub fn tokenize_with_offsets(
        &self,
        text: &str,
        language: &LanguageCode,
    ) -> Result<Vec<PositionedToken>, TokenizeError> {
        let positioned = match backend_for(language) {
            Backend::Standard => StandardTokenizer
                .tokenize_with_offsets(text)
                .into_iter()
                .map(|(offset, token)| PositionedToken { offset, token })
                .collect(),
            Backend::Dictionary(script) => self.segment(text, script)?,
        };
        debug!(
            "Tokenized {} bytes of {language} into {} tokens",
            text.len(),
            positioned.len()
        );
        Ok(positioned)
    }

    fn segment(&self, text: &str, script: Script) -> Result<Vec<PositionedToken>, TokenizeError> {
        let segmenter = self.segmenters.get(script)?;
        let mut units: Vec<(usize, TokenKind, &str)> = Vec::new();

        let mut line_start = 0;
        for brk in standard::LINE_BREAK_RUNS.find_iter(text) {
            segment_line(segmenter.as_ref(), text, line_start..brk.start(), &mut units);
            units.push((brk.start(), TokenKind::ParagraphBreak, brk.as_str()));
            line_start = brk.end();
        }
        segment_line(segmenter.as_ref(), text, line_start..text.len(), &mut units);

        Ok(units
            .into_iter()
            .enumerate()
            .map(|(ordinal, (offset, kind, unit))| PositionedToken {
                offset,
                token: Token::new(ordinal as u64, kind, unit),
            })
            .collect())
    }
}

/// Segment one line and place each unit back in the source so offsets stay
/// meaningful. Units the segmenter invented (not found in the line) are
/// placed at the current cursor.
fn segment_line<'t>(
    segmenter: &dyn Segmenter,
    text: &'t str,
    range: std::ops::Range<usize>,
    out: &mut Vec<(usize, TokenKind, &'t str)>,
) {
    let line = &text[range.clone()];
    if line.trim().is_empty() {
        return;
    }
    let mut cursor = 0;
    for unit in segmenter.segment(line) {
        let Some(kind) = standard::classify(&unit) else {
            continue;
        };
        match line[cursor..].find(unit.as_str()) {
            Some(found) => {
                let start = cursor + found;
                cursor = start + unit.len();
                out.push((range.start + start, kind, &line[start..cursor]));
            }
            None => {
                debug!("Segmenter unit {unit:?} not found in source line, skipping");
            }
        }
    }
}
