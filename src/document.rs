use crate::error::{EmptyDocument, TokenizeError};
use crate::tokenizer::{LanguageCode, Tokenizer};
use std::collections::HashMap;
use std::ops::{Range, RangeInclusive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Punctuation,
    ParagraphBreak,
}

/// One classified unit of text. The ordinal is assigned once when the
/// document is built and is the only address other components use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ordinal: u64,
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(ordinal: u64, kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            kind,
            text: text.into(),
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    pub fn is_paragraph_break(&self) -> bool {
        self.kind == TokenKind::ParagraphBreak
    }
}

/// One reading-order content unit of a packaged document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkDescriptor {
    pub id: String,
    pub source_href: String,
    pub word_count: u32,
    pub start_word_no: u32,
    /// Ordinal of the chunk's first token in the merged document.
    pub start_ordinal: u64,
    pub token_count: u64,
    /// Fragment id -> token offset relative to `start_ordinal`.
    pub anchors: HashMap<String, u64>,
}

impl ChunkDescriptor {
    pub fn end_ordinal(&self) -> u64 {
        self.start_ordinal + self.token_count
    }

    pub fn anchor_ordinal(&self, fragment: &str) -> Option<u64> {
        self.anchors
            .get(fragment)
            .map(|offset| self.start_ordinal + offset)
    }
}

/// Fill in `start_word_no` and `start_ordinal` with a running sum over
/// chunks that are already in reading order.
pub fn assign_offsets(chunks: &mut [ChunkDescriptor]) {
    let mut word_no = 0u32;
    let mut ordinal = 0u64;
    for chunk in chunks.iter_mut() {
        chunk.start_word_no = word_no;
        chunk.start_ordinal = ordinal;
        word_no += chunk.word_count;
        ordinal += chunk.token_count;
    }
}

pub const ROOT_SECTION_LABEL: &str = "root";

/// Node of the table of contents tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNode {
    pub label: String,
    /// Archive path of the content unit the section points into.
    pub content_ref: String,
    pub fragment_id: Option<String>,
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    pub fn new(label: impl Into<String>, content_ref: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content_ref: content_ref.into(),
            fragment_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment_id = Some(fragment.into());
        self
    }

    pub fn with_children(mut self, children: Vec<SectionNode>) -> Self {
        self.children = children;
        self
    }

    /// Synthetic root holding the top-level sections.
    pub fn root(children: Vec<SectionNode>) -> Self {
        Self::new(ROOT_SECTION_LABEL, "").with_children(children)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Pre-order walk over every node below this one, with its depth
    /// (children of `self` are depth 0).
    pub fn descendants(&self) -> Vec<(usize, &SectionNode)> {
        let mut out = Vec::new();
        Self::collect(&self.children, 0, &mut out);
        out
    }

    fn collect<'a>(nodes: &'a [SectionNode], depth: usize, out: &mut Vec<(usize, &'a SectionNode)>) {
        for node in nodes {
            out.push((depth, node));
            Self::collect(&node.children, depth + 1, out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub language: Option<String>,
}

/// The token stream of a loaded document plus its structure.
///
/// Never mutated after construction; pages and selections are ordinal
/// ranges into `tokens`.
#[derive(Debug, Clone, Default)]
pub struct TokenizedDocument {
    tokens: Vec<Token>,
    sections: Option<SectionNode>,
    chunks: Vec<ChunkDescriptor>,
    metadata: DocumentMetadata,
    paragraph_breaks: Vec<u64>,
}

impl TokenizedDocument {
    pub fn new(tokens: Vec<Token>, sections: Option<SectionNode>) -> Self {
        Self::from_parts(tokens, Vec::new(), sections, DocumentMetadata::default())
    }

    pub fn from_parts(
        tokens: Vec<Token>,
        chunks: Vec<ChunkDescriptor>,
        sections: Option<SectionNode>,
        metadata: DocumentMetadata,
    ) -> Self {
        debug_assert!(
            tokens
                .iter()
                .enumerate()
                .all(|(i, token)| token.ordinal == i as u64),
            "token ordinals must be dense and zero-based"
        );
        let paragraph_breaks = tokens
            .iter()
            .filter(|token| token.is_paragraph_break())
            .map(|token| token.ordinal)
            .collect();
        Self {
            tokens,
            sections,
            chunks,
            metadata,
            paragraph_breaks,
        }
    }

    /// Tokenize a plain text buffer. The whole text becomes a single chunk.
    pub fn from_text(
        text: &str,
        language: &LanguageCode,
        tokenizer: &Tokenizer,
    ) -> Result<Self, TokenizeError> {
        let tokens = tokenizer.tokenize(text, language)?;
        let chunk = ChunkDescriptor {
            id: "text".to_string(),
            source_href: String::new(),
            word_count: tokens.iter().filter(|t| t.is_word()).count() as u32,
            token_count: tokens.len() as u64,
            ..Default::default()
        };
        let metadata = DocumentMetadata {
            language: Some(language.as_str().to_string()),
            ..Default::default()
        };
        Ok(Self::from_parts(tokens, vec![chunk], None, metadata))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, ordinal: u64) -> Option<&Token> {
        self.tokens.get(usize::try_from(ordinal).ok()?)
    }

    pub fn len(&self) -> u64 {
        self.tokens.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn ensure_not_empty(&self) -> Result<(), EmptyDocument> {
        if self.is_empty() {
            Err(EmptyDocument)
        } else {
            Ok(())
        }
    }

    pub fn sections(&self) -> Option<&SectionNode> {
        self.sections.as_ref()
    }

    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn word_count(&self) -> u64 {
        self.tokens.iter().filter(|t| t.is_word()).count() as u64
    }

    /// Index of the paragraph containing `ordinal`. A paragraph break
    /// belongs to the paragraph it terminates.
    pub fn paragraph_of(&self, ordinal: u64) -> usize {
        self.paragraph_breaks.partition_point(|&b| b < ordinal)
    }

    /// Half-open ordinal range of the paragraph containing `ordinal`,
    /// including its trailing break when there is one.
    pub fn paragraph_range(&self, ordinal: u64) -> Range<u64> {
        let index = self.paragraph_of(ordinal);
        let start = match index {
            0 => 0,
            i => self.paragraph_breaks[i - 1] + 1,
        };
        let end = self
            .paragraph_breaks
            .get(index)
            .map(|b| b + 1)
            .unwrap_or(self.len());
        start..end
    }

    pub fn same_paragraph(&self, a: u64, b: u64) -> bool {
        self.paragraph_of(a) == self.paragraph_of(b)
    }

    /// Concatenated token text over an inclusive ordinal range.
    pub fn text_of(&self, range: RangeInclusive<u64>) -> String {
        self.slice(range).iter().map(|t| t.text.as_str()).collect()
    }

    /// Token text over an inclusive range with a space before every word
    /// that follows another token, for space-delimited scripts.
    pub fn spaced_text_of(&self, range: RangeInclusive<u64>) -> String {
        let mut out = String::new();
        for token in self.slice(range) {
            if token.is_word() && !out.is_empty() && !out.ends_with('\n') {
                out.push(' ');
            }
            out.push_str(&token.text);
        }
        out
    }

    fn slice(&self, range: RangeInclusive<u64>) -> &[Token] {
        let len = self.tokens.len();
        let start = (*range.start() as usize).min(len);
        let end = (*range.end() as usize).saturating_add(1).min(len);
        if start >= end {
            return &[];
        }
        &self.tokens[start..end]
    }

    pub fn chunk_for_href(&self, href: &str) -> Option<&ChunkDescriptor> {
        self.chunks.iter().find(|chunk| chunk.source_href == href)
    }

    /// Resolve a section to the ordinal where it starts. Unknown fragments
    /// fall back to the start of the chunk.
    pub fn section_start(&self, section: &SectionNode) -> Option<u64> {
        let chunk = self.chunk_for_href(&section.content_ref)?;
        let ordinal = section
            .fragment_id
            .as_deref()
            .and_then(|fragment| chunk.anchor_ordinal(fragment))
            .unwrap_or(chunk.start_ordinal);
        Some(ordinal)
    }

    /// Every section that resolves to an ordinal, in pre-order, with depth.
    pub fn resolved_sections(&self) -> Vec<(usize, &SectionNode, u64)> {
        let Some(root) = self.sections.as_ref() else {
            return Vec::new();
        };
        root.descendants()
            .into_iter()
            .filter_map(|(depth, node)| Some((depth, node, self.section_start(node)?)))
            .collect()
    }

    /// The section a reader at `ordinal` is in: the last section in
    /// pre-order whose start is at or before `ordinal`.
    pub fn section_at(&self, ordinal: u64) -> Option<&SectionNode> {
        self.resolved_sections()
            .into_iter()
            .filter(|&(_, _, start)| start <= ordinal)
            .last()
            .map(|(_, node, _)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(kinds: &[TokenKind]) -> TokenizedDocument {
        let tokens = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let text = match kind {
                    TokenKind::ParagraphBreak => "\n",
                    TokenKind::Punctuation => ".",
                    TokenKind::Word => "w",
                };
                Token::new(i as u64, *kind, text)
            })
            .collect();
        TokenizedDocument::new(tokens, None)
    }

    #[test]
    fn test_chunk_offsets_with_empty_chunk() {
        let mut chunks: Vec<ChunkDescriptor> = [10u32, 0, 5]
            .iter()
            .map(|&word_count| ChunkDescriptor {
                word_count,
                token_count: word_count as u64,
                ..Default::default()
            })
            .collect();
        assign_offsets(&mut chunks);

        let starts: Vec<u32> = chunks.iter().map(|c| c.start_word_no).collect();
        assert_eq!(starts, vec![0, 10, 10]);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_word_no, pair[0].start_word_no + pair[0].word_count);
            assert_eq!(pair[1].start_ordinal, pair[0].end_ordinal());
        }
    }

    #[test]
    fn test_paragraph_ranges() {
        use TokenKind::*;
        let doc = doc(&[Word, Word, ParagraphBreak, Word, Punctuation, ParagraphBreak, Word]);

        assert_eq!(doc.paragraph_range(0), 0..3);
        assert_eq!(doc.paragraph_range(2), 0..3);
        assert_eq!(doc.paragraph_range(3), 3..6);
        assert_eq!(doc.paragraph_range(6), 6..7);
        assert!(doc.same_paragraph(3, 5));
        assert!(!doc.same_paragraph(2, 3));
    }

    #[test]
    fn test_spaced_text() {
        let tokens = vec![
            Token::new(0, TokenKind::Word, "Hello"),
            Token::new(1, TokenKind::Punctuation, ","),
            Token::new(2, TokenKind::Word, "world"),
        ];
        let doc = TokenizedDocument::new(tokens, None);
        assert_eq!(doc.text_of(0..=2), "Hello,world");
        assert_eq!(doc.spaced_text_of(0..=2), "Hello, world");
        assert_eq!(doc.text_of(1..=9), ",world");
    }

    #[test]
    fn test_section_at_follows_preorder() {
        use TokenKind::*;
        let tokens = (0..20u64).map(|i| Token::new(i, Word, "w")).collect();
        let mut anchors = HashMap::new();
        anchors.insert("part2".to_string(), 5);
        let chunks = vec![
            ChunkDescriptor {
                id: "c1".into(),
                source_href: "a.xhtml".into(),
                token_count: 10,
                anchors,
                ..Default::default()
            },
            ChunkDescriptor {
                id: "c2".into(),
                source_href: "b.xhtml".into(),
                start_ordinal: 10,
                token_count: 10,
                ..Default::default()
            },
        ];
        let sections = SectionNode::root(vec![
            SectionNode::new("One", "a.xhtml")
                .with_children(vec![SectionNode::new("One.Two", "a.xhtml").with_fragment("part2")]),
            SectionNode::new("Two", "b.xhtml"),
            SectionNode::new("Missing", "c.xhtml"),
        ]);
        let doc = TokenizedDocument::from_parts(tokens, chunks, Some(sections), Default::default());

        assert_eq!(doc.section_at(0).unwrap().label, "One");
        assert_eq!(doc.section_at(7).unwrap().label, "One.Two");
        assert_eq!(doc.section_at(19).unwrap().label, "Two");
        assert_eq!(doc.resolved_sections().len(), 3);
    }

    #[test]
    fn test_section_at_with_sections_out_of_reading_order() {
        let tokens = (0..20u64).map(|i| Token::new(i, TokenKind::Word, "w")).collect();
        let chunks = vec![
            ChunkDescriptor {
                id: "a".into(),
                source_href: "a.xhtml".into(),
                token_count: 10,
                ..Default::default()
            },
            ChunkDescriptor {
                id: "b".into(),
                source_href: "b.xhtml".into(),
                start_ordinal: 10,
                token_count: 10,
                ..Default::default()
            },
        ];
        let sections = SectionNode::root(vec![
            SectionNode::new("B", "b.xhtml"),
            SectionNode::new("A", "a.xhtml"),
        ]);
        let doc = TokenizedDocument::from_parts(tokens, chunks, Some(sections), Default::default());

        assert_eq!(doc.section_at(15).unwrap().label, "A");
        assert_eq!(doc.section_at(5).unwrap().label, "A");
    }

    #[test]
    fn test_empty_document() {
        let doc = TokenizedDocument::default();
        assert!(doc.is_empty());
        assert_eq!(doc.ensure_not_empty(), Err(EmptyDocument));
        assert_eq!(doc.paragraph_range(0), 0..0);
    }
}
