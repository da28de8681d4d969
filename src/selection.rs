//! In-page text selection anchored at the token under pointer-down

use crate::document::TokenizedDocument;
use crate::pager::PageWindow;
use log::debug;

/// Contiguous selected tokens. The anchor is always one of the two edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub anchor: u64,
    pub first: u64,
    pub last: u64,
}

impl SelectionRange {
    fn at(ordinal: u64) -> Self {
        Self {
            anchor: ordinal,
            first: ordinal,
            last: ordinal,
        }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    #[must_use]
    pub fn contains(&self, ordinal: u64) -> bool {
        self.first <= ordinal && ordinal <= self.last
    }

    /// Concatenated text of the selected tokens in ordinal order
    #[must_use]
    pub fn text(&self, document: &TokenizedDocument) -> String {
        document.text_of(self.first..=self.last)
    }
}

/// Selection state machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Idle,
    Active(SelectionRange),
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a selection at a token. Tokens outside the window and paragraph
    /// breaks (never rendered) cannot be selected.
    pub fn begin_at(
        &mut self,
        document: &TokenizedDocument,
        window: PageWindow,
        ordinal: u64,
    ) -> bool {
        if !Self::selectable(document, window, ordinal) {
            return false;
        }
        *self = Selection::Active(SelectionRange::at(ordinal));
        true
    }

    /// Move the free edge of the selection to `ordinal`.
    ///
    /// Targets in another paragraph than the anchor are ignored. Moving past
    /// either edge re-anchors the opposite edge and grows toward the target;
    /// moving back inside the range trims the free edge. Returns whether the
    /// range changed.
    pub fn extend_to(
        &mut self,
        document: &TokenizedDocument,
        window: PageWindow,
        ordinal: u64,
    ) -> bool {
        let Selection::Active(range) = *self else {
            return false;
        };
        if !Self::selectable(document, window, ordinal)
            || !document.same_paragraph(range.anchor, ordinal)
        {
            return false;
        }

        let anchor = range.anchor;
        let updated = if ordinal < range.first {
            SelectionRange {
                anchor,
                first: ordinal,
                last: anchor,
            }
        } else if ordinal > range.last {
            SelectionRange {
                anchor,
                first: anchor,
                last: ordinal,
            }
        } else if ordinal > anchor {
            SelectionRange {
                anchor,
                first: anchor,
                last: ordinal,
            }
        } else if ordinal < anchor {
            SelectionRange {
                anchor,
                first: ordinal,
                last: anchor,
            }
        } else {
            SelectionRange::at(anchor)
        };

        if updated == range {
            return false;
        }
        debug!(
            "Selection {}..={} -> {}..={}",
            range.first, range.last, updated.first, updated.last
        );
        *self = Selection::Active(updated);
        true
    }

    pub fn clear(&mut self) {
        *self = Selection::Idle;
    }

    #[must_use]
    pub fn range(&self) -> Option<SelectionRange> {
        match self {
            Selection::Idle => None,
            Selection::Active(range) => Some(*range),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Selection::Active(_))
    }

    #[must_use]
    pub fn text(&self, document: &TokenizedDocument) -> Option<String> {
        self.range().map(|range| range.text(document))
    }

    fn selectable(document: &TokenizedDocument, window: PageWindow, ordinal: u64) -> bool {
        window.contains(ordinal)
            && document
                .token(ordinal)
                .is_some_and(|token| !token.is_paragraph_break())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Token, TokenKind};

    /// "w0 w1 ... w11 \n w13 ... w17 \n"
    fn document() -> TokenizedDocument {
        let mut tokens: Vec<Token> = (0..12)
            .map(|i| Token::new(i, TokenKind::Word, format!("w{i}")))
            .collect();
        tokens.push(Token::new(12, TokenKind::ParagraphBreak, "\n"));
        for i in 13..18 {
            tokens.push(Token::new(i, TokenKind::Word, format!("w{i}")));
        }
        tokens.push(Token::new(18, TokenKind::ParagraphBreak, "\n"));
        TokenizedDocument::new(tokens, None)
    }

    fn window() -> PageWindow {
        PageWindow::new(0, 19)
    }

    fn bounds(selection: &Selection) -> (u64, u64, u64) {
        let range = selection.range().expect("selection should be active");
        (range.first, range.anchor, range.last)
    }

    #[test]
    fn test_drag_back_trims_free_edge() {
        let doc = document();
        let mut selection = Selection::new();
        assert!(selection.begin_at(&doc, window(), 5));

        assert!(selection.extend_to(&doc, window(), 9));
        assert_eq!(bounds(&selection), (5, 5, 9));

        assert!(selection.extend_to(&doc, window(), 7));
        assert_eq!(bounds(&selection), (5, 5, 7));
        assert_eq!(selection.text(&doc).unwrap(), "w5w6w7");
    }

    #[test]
    fn test_crossing_the_anchor_flips_direction() {
        let doc = document();
        let mut selection = Selection::new();
        selection.begin_at(&doc, window(), 5);
        selection.extend_to(&doc, window(), 9);

        assert!(selection.extend_to(&doc, window(), 2));
        assert_eq!(bounds(&selection), (2, 5, 5));

        assert!(selection.extend_to(&doc, window(), 3));
        assert_eq!(bounds(&selection), (3, 5, 5));
    }

    #[test]
    fn test_extend_to_anchor_collapses() {
        let doc = document();
        let mut selection = Selection::new();
        selection.begin_at(&doc, window(), 5);
        selection.extend_to(&doc, window(), 8);

        assert!(selection.extend_to(&doc, window(), 5));
        assert_eq!(bounds(&selection), (5, 5, 5));
        assert!(!selection.extend_to(&doc, window(), 5));
    }

    #[test]
    fn test_other_paragraph_is_ignored() {
        let doc = document();
        let mut selection = Selection::new();
        selection.begin_at(&doc, window(), 10);
        selection.extend_to(&doc, window(), 11);

        assert!(!selection.extend_to(&doc, window(), 14));
        assert!(!selection.extend_to(&doc, window(), 12));
        assert_eq!(bounds(&selection), (10, 10, 11));
    }

    #[test]
    fn test_confinement_over_drag_sequence() {
        let doc = document();
        let mut selection = Selection::new();
        selection.begin_at(&doc, window(), 6);
        for target in [0, 18, 11, 3, 13, 6, 9, 1, 17, 4] {
            selection.extend_to(&doc, window(), target);
            let range = selection.range().unwrap();
            assert!(range.first <= range.anchor && range.anchor <= range.last);
            for ordinal in range.first..=range.last {
                assert!(doc.same_paragraph(ordinal, range.anchor));
            }
        }
    }

    #[test]
    fn test_outside_window_and_clear() {
        let doc = document();
        let mut selection = Selection::new();
        let page = PageWindow::new(0, 6);

        assert!(!selection.begin_at(&doc, page, 8));
        assert!(!selection.is_active());

        selection.begin_at(&doc, page, 2);
        assert!(!selection.extend_to(&doc, page, 7));
        selection.clear();
        assert_eq!(selection, Selection::Idle);
        assert!(!selection.extend_to(&doc, page, 3));
    }
}
