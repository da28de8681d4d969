use crate::document::TokenizedDocument;
use log::debug;

/// Tokens moved by a coarse skip unless configured otherwise.
pub const DEFAULT_SKIP_AMOUNT: u64 = 1000;

/// Half-open ordinal range `[start, end)` of the tokens on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PageWindow {
    pub start: u64,
    pub end: u64,
}

impl PageWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, ordinal: u64) -> bool {
        self.start <= ordinal && ordinal < self.end
    }

    /// Ordinal of the last token in the window.
    pub fn last(&self) -> Option<u64> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - 1)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Answers "does this candidate window still fit on the display?".
///
/// The pager never measures anything itself. Any `FnMut(u64) -> bool`
/// taking the candidate token count is an oracle; wrap a closure in
/// [`WindowOracle`] when the answer depends on which tokens are in it.
pub trait CapacityOracle {
    fn fits(&mut self, candidate: PageWindow) -> bool;
}

impl<F> CapacityOracle for F
where
    F: FnMut(u64) -> bool,
{
    fn fits(&mut self, candidate: PageWindow) -> bool {
        self(candidate.len())
    }
}

pub struct WindowOracle<F>(pub F);

impl<F> CapacityOracle for WindowOracle<F>
where
    F: FnMut(PageWindow) -> bool,
{
    fn fits(&mut self, candidate: PageWindow) -> bool {
        (self.0)(candidate)
    }
}

/// Computes paragraph-atomic windows over a document.
///
/// Windows grow one paragraph at a time and a paragraph that does not fit
/// is left out in full, so boundaries fall right after a paragraph break.
/// The one exception is a paragraph that does not fit even on an otherwise
/// empty page: it is split at token granularity so a window is never empty.
pub struct Pager<'a> {
    document: &'a TokenizedDocument,
}

impl<'a> Pager<'a> {
    pub fn new(document: &'a TokenizedDocument) -> Self {
        Self { document }
    }

    pub fn page(
        &self,
        direction: Direction,
        from: PageWindow,
        oracle: &mut dyn CapacityOracle,
    ) -> PageWindow {
        if self.document.is_empty() {
            return PageWindow::default();
        }
        match direction {
            Direction::Forward => {
                if self.is_last_page(from) {
                    return from;
                }
                self.grow_forward(from.end, oracle)
            }
            Direction::Backward => {
                if self.is_first_page(from) {
                    return from;
                }
                // Always ends at `from.start`. When that is also where the
                // forward-grown first page ends, both windows are equal.
                self.grow_backward(from.start.min(self.document.len()), oracle)
            }
        }
    }

    pub fn jump_to(&self, ordinal: u64, oracle: &mut dyn CapacityOracle) -> PageWindow {
        if self.document.is_empty() {
            return PageWindow::default();
        }
        let ordinal = self.rendered_target(ordinal.min(self.document.len() - 1));
        self.grow_forward(ordinal, oracle)
    }

    /// Coarse navigation: jump `amount` tokens past the trailing edge
    /// (forward) or before the leading edge (backward).
    pub fn skip(
        &self,
        direction: Direction,
        from: PageWindow,
        amount: u64,
        oracle: &mut dyn CapacityOracle,
    ) -> PageWindow {
        let target = match direction {
            Direction::Forward => from.end.saturating_add(amount),
            Direction::Backward => from.start.saturating_sub(amount),
        };
        debug!("Skipping {direction:?} by {amount} tokens to ordinal {target}");
        self.jump_to(target, oracle)
    }

    pub fn is_first_page(&self, window: PageWindow) -> bool {
        window.start == 0
    }

    pub fn is_last_page(&self, window: PageWindow) -> bool {
        window.end >= self.document.len()
    }

    /// Breaks are never drawn, so a target on one moves to the next token
    /// that is. Trailing breaks fall back to the start of the last paragraph
    /// with content.
    fn rendered_target(&self, ordinal: u64) -> u64 {
        let tokens = self.document.tokens();
        let index = ordinal as usize;
        if let Some(offset) = tokens[index..]
            .iter()
            .position(|t| !t.is_paragraph_break())
        {
            return ordinal + offset as u64;
        }
        match tokens[..index].iter().rposition(|t| !t.is_paragraph_break()) {
            Some(last) => self.document.paragraph_range(last as u64).start,
            None => ordinal,
        }
    }

    fn grow_forward(&self, start: u64, oracle: &mut dyn CapacityOracle) -> PageWindow {
        let len = self.document.len();
        let mut end = start;
        while end < len {
            let next = self.document.paragraph_range(end).end;
            if !oracle.fits(PageWindow::new(start, next)) {
                break;
            }
            end = next;
        }

        if end == start && start < len {
            let limit = self.document.paragraph_range(start).end;
            end = start + 1;
            while end < limit && oracle.fits(PageWindow::new(start, end + 1)) {
                end += 1;
            }
            debug!("Paragraph at {start} overflows the page, split at {end}");
        }
        PageWindow::new(start, end)
    }

    fn grow_backward(&self, end: u64, oracle: &mut dyn CapacityOracle) -> PageWindow {
        let mut start = end;
        while start > 0 {
            let previous = self.document.paragraph_range(start - 1).start;
            if !oracle.fits(PageWindow::new(previous, end)) {
                break;
            }
            start = previous;
        }

        if start == end && end > 0 {
            let limit = self.document.paragraph_range(end - 1).start;
            start = end - 1;
            while start > limit && oracle.fits(PageWindow::new(start - 1, end)) {
                start -= 1;
            }
            debug!("Paragraph before {end} overflows the page, split at {start}");
        }
        PageWindow::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Token, TokenKind};

    /// Paragraphs of the given word counts, each followed by a break.
    fn document(paragraphs: &[usize]) -> TokenizedDocument {
        let mut tokens = Vec::new();
        for &words in paragraphs {
            for _ in 0..words {
                tokens.push(Token::new(tokens.len() as u64, TokenKind::Word, "w"));
            }
            tokens.push(Token::new(tokens.len() as u64, TokenKind::ParagraphBreak, "\n"));
        }
        TokenizedDocument::new(tokens, None)
    }

    fn capacity(n: u64) -> impl FnMut(u64) -> bool {
        move |count| count <= n
    }

    fn ends_on_boundary(doc: &TokenizedDocument, window: PageWindow) -> bool {
        window.end == doc.len()
            || doc.token(window.end - 1).is_some_and(|t| t.is_paragraph_break())
    }

    #[test]
    fn test_forward_pages_are_paragraph_atomic() {
        // 4 + 1, 2 + 1, 6 + 1, 3 + 1 tokens
        let doc = document(&[4, 2, 6, 3]);
        let pager = Pager::new(&doc);

        let first = pager.jump_to(0, &mut capacity(9));
        assert_eq!(first, PageWindow::new(0, 8));

        let second = pager.page(Direction::Forward, first, &mut capacity(9));
        assert_eq!(second, PageWindow::new(8, 15));

        let third = pager.page(Direction::Forward, second, &mut capacity(9));
        assert_eq!(third, PageWindow::new(15, 19));
        assert!(pager.is_last_page(third));

        let stuck = pager.page(Direction::Forward, third, &mut capacity(9));
        assert_eq!(stuck, third);
    }

    #[test]
    fn test_boundaries_hold_for_every_capacity() {
        let doc = document(&[3, 1, 5, 2, 2, 4, 1]);
        let pager = Pager::new(&doc);
        for cap in 6..=doc.len() {
            let mut window = pager.jump_to(0, &mut capacity(cap));
            loop {
                assert!(window.len() <= cap);
                assert!(ends_on_boundary(&doc, window), "cap {cap}: {window:?}");
                if pager.is_last_page(window) {
                    break;
                }
                let next = pager.page(Direction::Forward, window, &mut capacity(cap));
                assert_eq!(next.start, window.end);
                window = next;
            }
        }
    }

    #[test]
    fn test_backward_paging() {
        let doc = document(&[4, 2, 6, 3]);
        let pager = Pager::new(&doc);

        let last = PageWindow::new(15, 19);
        let previous = pager.page(Direction::Backward, last, &mut capacity(9));
        assert_eq!(previous, PageWindow::new(8, 15));
        assert!(ends_on_boundary(&doc, previous));

        // Reaching the beginning yields the canonical first page.
        let first = pager.page(Direction::Backward, previous, &mut capacity(9));
        assert_eq!(first, pager.jump_to(0, &mut capacity(9)));
        assert!(pager.is_first_page(first));
        assert_eq!(pager.page(Direction::Backward, first, &mut capacity(9)), first);
    }

    #[test]
    fn test_oversized_paragraph_is_split() {
        let doc = document(&[10, 2]);
        let pager = Pager::new(&doc);

        let first = pager.jump_to(0, &mut capacity(4));
        assert_eq!(first, PageWindow::new(0, 4));
        let second = pager.page(Direction::Forward, first, &mut capacity(4));
        assert_eq!(second, PageWindow::new(4, 8));
        let third = pager.page(Direction::Forward, second, &mut capacity(4));
        assert_eq!(third, PageWindow::new(8, 11));

        // A zero-capacity oracle still yields one token.
        let tiny = pager.jump_to(0, &mut capacity(0));
        assert_eq!(tiny, PageWindow::new(0, 1));
    }

    #[test]
    fn test_jump_is_clamped_and_idempotent() {
        let doc = document(&[4, 2, 6]);
        let pager = Pager::new(&doc);

        let a = pager.jump_to(5, &mut capacity(8));
        let b = pager.jump_to(5, &mut capacity(8));
        assert_eq!(a, b);
        assert_eq!(a.start, 5);

        // Clamped onto the closing break, then back to the last paragraph.
        let clamped = pager.jump_to(10_000, &mut capacity(8));
        assert_eq!(clamped, PageWindow::new(8, doc.len()));
    }

    #[test]
    fn test_jump_onto_break_shows_next_paragraph() {
        let doc = document(&[3, 3, 3]);
        let pager = Pager::new(&doc);

        let window = pager.jump_to(3, &mut capacity(4));
        assert_eq!(window, PageWindow::new(4, 8));
        assert!(!doc.token(window.start).unwrap().is_paragraph_break());

        let tokens = vec![
            Token::new(0, TokenKind::Word, "w"),
            Token::new(1, TokenKind::ParagraphBreak, "\n"),
            Token::new(2, TokenKind::ParagraphBreak, "\n"),
        ];
        let doc = TokenizedDocument::new(tokens, None);
        let pager = Pager::new(&doc);
        assert_eq!(pager.jump_to(2, &mut capacity(4)), PageWindow::new(0, 3));
    }

    #[test]
    fn test_backward_from_mid_paragraph_shows_skipped_tokens() {
        let doc = document(&[4, 4]);
        let pager = Pager::new(&doc);

        let from = pager.jump_to(7, &mut capacity(8));
        assert_eq!(from, PageWindow::new(7, 10));

        let back = pager.page(Direction::Backward, from, &mut capacity(8));
        assert_eq!(back.end, from.start);
        assert_eq!(back, PageWindow::new(0, 7));
        assert!(pager.is_first_page(back));
    }

    #[test]
    fn test_skip() {
        let doc = document(&[5; 400]);
        let pager = Pager::new(&doc);
        let start = pager.jump_to(0, &mut capacity(30));

        let ahead = pager.skip(Direction::Forward, start, DEFAULT_SKIP_AMOUNT, &mut capacity(30));
        assert_eq!(ahead.start, start.end + DEFAULT_SKIP_AMOUNT);

        let back = pager.skip(Direction::Backward, ahead, DEFAULT_SKIP_AMOUNT, &mut capacity(30));
        assert_eq!(back.start, ahead.start - DEFAULT_SKIP_AMOUNT);

        let home = pager.skip(Direction::Backward, back, DEFAULT_SKIP_AMOUNT * 5, &mut capacity(30));
        assert!(pager.is_first_page(home));
    }

    #[test]
    fn test_window_oracle_sees_candidates() {
        let doc = document(&[2, 2, 2]);
        let pager = Pager::new(&doc);
        let mut seen = Vec::new();
        let window = pager.jump_to(
            0,
            &mut WindowOracle(|candidate: PageWindow| {
                seen.push(candidate);
                candidate.end <= 6
            }),
        );
        assert_eq!(window, PageWindow::new(0, 6));
        assert_eq!(seen, vec![PageWindow::new(0, 3), PageWindow::new(0, 6), PageWindow::new(0, 9)]);
    }

    #[test]
    fn test_empty_document() {
        let doc = TokenizedDocument::default();
        let pager = Pager::new(&doc);
        assert_eq!(pager.jump_to(3, &mut capacity(10)), PageWindow::default());
        assert_eq!(
            pager.page(Direction::Forward, PageWindow::default(), &mut capacity(10)),
            PageWindow::default()
        );
    }
}
