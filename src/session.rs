//! Reading session: one open document, its current window and selection.
//!
//! The session routes navigation to the [`Pager`] and pointer events to the
//! [`Selection`], and tells the host about the results. Everything the host
//! cares about (persistence, translation) goes through [`SessionHost`].

use crate::document::{SectionNode, TokenizedDocument};
use crate::pager::{CapacityOracle, DEFAULT_SKIP_AMOUNT, Direction, PageWindow, Pager};
use crate::selection::{Selection, SelectionRange};
use crate::settings::ReaderSettings;
use crate::tokenizer::LanguageCode;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Callbacks from a session to the application embedding it. Every method
/// has a no-op default.
pub trait SessionHost {
    /// A new window was committed.
    fn window_changed(&mut self, _window: PageWindow) {}

    fn save_progress(&mut self, _ordinal: u64, _percentage: f64) {}

    /// Ordinal to resume at when the session starts.
    fn load_progress(&mut self) -> Option<u64> {
        None
    }

    /// Translate a committed selection. A returned string annotates the
    /// selection's anchor token.
    fn translate(
        &mut self,
        _text: &str,
        _content_language: &LanguageCode,
        _target_language: &LanguageCode,
    ) -> Option<String> {
        None
    }
}

impl SessionHost for () {}

pub struct ReadingSession<H: SessionHost> {
    document: Arc<TokenizedDocument>,
    host: H,
    window: PageWindow,
    selection: Selection,
    dragged: bool,
    content_language: LanguageCode,
    target_language: LanguageCode,
    skip_amount: u64,
    annotations: HashMap<u64, String>,
}

impl<H: SessionHost> ReadingSession<H> {
    pub fn new(
        document: Arc<TokenizedDocument>,
        host: H,
        content_language: LanguageCode,
        target_language: LanguageCode,
    ) -> Self {
        Self {
            document,
            host,
            window: PageWindow::default(),
            selection: Selection::new(),
            dragged: false,
            content_language,
            target_language,
            skip_amount: DEFAULT_SKIP_AMOUNT,
            annotations: HashMap::new(),
        }
    }

    pub fn from_settings(
        document: Arc<TokenizedDocument>,
        host: H,
        settings: &ReaderSettings,
    ) -> Self {
        Self::new(
            document,
            host,
            settings.content_language.clone(),
            settings.target_language.clone(),
        )
        .with_skip_amount(settings.skip_amount)
    }

    pub fn with_skip_amount(mut self, amount: u64) -> Self {
        self.skip_amount = amount;
        self
    }

    /// Compute the first window, resuming where the host says the reader
    /// left off.
    pub fn start(&mut self, oracle: &mut dyn CapacityOracle) -> PageWindow {
        let resume = self.host.load_progress().unwrap_or(0);
        debug!("Starting session at ordinal {resume}");
        let window = Pager::new(&self.document).jump_to(resume, oracle);
        self.commit_window(window)
    }

    pub fn next_page(&mut self, oracle: &mut dyn CapacityOracle) -> PageWindow {
        let window = Pager::new(&self.document).page(Direction::Forward, self.window, oracle);
        self.commit_window(window)
    }

    pub fn previous_page(&mut self, oracle: &mut dyn CapacityOracle) -> PageWindow {
        let window = Pager::new(&self.document).page(Direction::Backward, self.window, oracle);
        self.commit_window(window)
    }

    pub fn jump_to(&mut self, ordinal: u64, oracle: &mut dyn CapacityOracle) -> PageWindow {
        let window = Pager::new(&self.document).jump_to(ordinal, oracle);
        self.commit_window(window)
    }

    pub fn skip(&mut self, direction: Direction, oracle: &mut dyn CapacityOracle) -> PageWindow {
        let window =
            Pager::new(&self.document).skip(direction, self.window, self.skip_amount, oracle);
        self.commit_window(window)
    }

    /// Recompute the window from its current start, e.g. after the display
    /// was resized.
    pub fn refit(&mut self, oracle: &mut dyn CapacityOracle) -> PageWindow {
        self.jump_to(self.window.start, oracle)
    }

    /// Sections that resolve to a position, in reading order, with depth.
    pub fn table_of_contents(&self) -> Vec<(usize, &SectionNode, u64)> {
        self.document.resolved_sections()
    }

    /// Jump to the `index`-th entry of [`table_of_contents`](Self::table_of_contents).
    pub fn jump_to_section(
        &mut self,
        index: usize,
        oracle: &mut dyn CapacityOracle,
    ) -> Option<PageWindow> {
        let (_, section, start) = self.document.resolved_sections().get(index).copied()?;
        debug!("Jumping to section {:?} at ordinal {start}", section.label);
        Some(self.jump_to(start, oracle))
    }

    /// The section containing the last token on screen.
    pub fn current_section(&self) -> Option<&SectionNode> {
        self.document.section_at(self.window.last()?)
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub fn is_first_page(&self) -> bool {
        Pager::new(&self.document).is_first_page(self.window)
    }

    pub fn is_last_page(&self) -> bool {
        Pager::new(&self.document).is_last_page(self.window)
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.document.is_empty() {
            return 0.0;
        }
        self.window.start as f64 / self.document.len() as f64 * 100.0
    }

    pub fn document(&self) -> &Arc<TokenizedDocument> {
        &self.document
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn pointer_down(&mut self, ordinal: u64) -> bool {
        self.dragged = false;
        let began = self
            .selection
            .begin_at(&self.document, self.window, ordinal);
        if !began {
            self.selection.clear();
        }
        began
    }

    pub fn pointer_move(&mut self, ordinal: u64) -> bool {
        let changed = self
            .selection
            .extend_to(&self.document, self.window, ordinal);
        self.dragged |= changed;
        changed
    }

    /// End a pointer gesture. A drag commits the selection; a plain tap
    /// discards it.
    pub fn pointer_up(&mut self) -> Option<String> {
        if std::mem::take(&mut self.dragged) {
            self.commit_selection()
        } else {
            self.selection.clear();
            None
        }
    }

    /// Send the selected text to the host for translation and keep the
    /// answer as an annotation on the anchor token.
    pub fn commit_selection(&mut self) -> Option<String> {
        let range = self.selection.range()?;
        let text = self.selection_text(range);
        debug!(
            "Committing selection {}..={} ({} tokens)",
            range.first,
            range.last,
            range.len()
        );
        let translation =
            self.host
                .translate(&text, &self.content_language, &self.target_language)?;
        self.annotations.insert(range.anchor, translation.clone());
        Some(translation)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.dragged = false;
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_text(&self) -> Option<String> {
        self.selection.range().map(|range| self.selection_text(range))
    }

    pub fn annotation(&self, ordinal: u64) -> Option<&str> {
        self.annotations.get(&ordinal).map(String::as_str)
    }

    fn selection_text(&self, range: SelectionRange) -> String {
        if self.content_language.backend().is_space_delimited() {
            self.document.spaced_text_of(range.first..=range.last)
        } else {
            range.text(&self.document)
        }
    }

    fn commit_window(&mut self, window: PageWindow) -> PageWindow {
        if window == self.window {
            return window;
        }
        debug!(
            "Window {}..{} -> {}..{}",
            self.window.start, self.window.end, window.start, window.end
        );
        self.window = window;
        self.clear_selection();
        self.host.window_changed(window);
        let percentage = self.progress_percentage();
        self.host.save_progress(window.start, percentage);
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;

    #[derive(Default)]
    struct RecordingHost {
        windows: Vec<PageWindow>,
        saved: Vec<(u64, f64)>,
        resume: Option<u64>,
        requests: Vec<(String, String, String)>,
    }

    impl SessionHost for RecordingHost {
        fn window_changed(&mut self, window: PageWindow) {
            self.windows.push(window);
        }

        fn save_progress(&mut self, ordinal: u64, percentage: f64) {
            self.saved.push((ordinal, percentage));
        }

        fn load_progress(&mut self) -> Option<u64> {
            self.resume
        }

        fn translate(
            &mut self,
            text: &str,
            content_language: &LanguageCode,
            target_language: &LanguageCode,
        ) -> Option<String> {
            self.requests.push((
                text.to_string(),
                content_language.to_string(),
                target_language.to_string(),
            ));
            Some(format!("<{text}>"))
        }
    }

    // 4 paragraphs of 4 tokens each (3 words + break).
    const TEXT: &str = "a b c\nd e f\ng h i\nj k l";

    fn session(host: RecordingHost) -> ReadingSession<RecordingHost> {
        let document =
            TokenizedDocument::from_text(TEXT, &"en".into(), &Tokenizer::default()).unwrap();
        ReadingSession::new(Arc::new(document), host, "en".into(), "de".into())
    }

    fn fits(n: u64) -> impl FnMut(u64) -> bool {
        move |count| count <= n
    }

    #[test]
    fn test_start_resumes_and_reports() {
        let mut session = session(RecordingHost {
            resume: Some(5),
            ..Default::default()
        });
        let window = session.start(&mut fits(8));
        assert_eq!(window, PageWindow::new(5, 12));

        let host = session.host();
        assert_eq!(host.windows, vec![window]);
        assert_eq!(host.saved.len(), 1);
        assert_eq!(host.saved[0].0, 5);
    }

    #[test]
    fn test_paging_updates_host_and_section() {
        let mut session = session(RecordingHost::default());
        session.start(&mut fits(8));
        assert!(session.is_first_page());
        assert_eq!(session.window(), PageWindow::new(0, 8));

        session.next_page(&mut fits(8));
        assert_eq!(session.window(), PageWindow::new(8, 15));
        assert!(session.is_last_page());
        assert_eq!(session.progress_percentage(), 8.0 / 15.0 * 100.0);

        // No change, no callbacks.
        session.next_page(&mut fits(8));
        assert_eq!(session.host().windows.len(), 2);

        session.previous_page(&mut fits(8));
        assert_eq!(session.window(), PageWindow::new(0, 8));
        assert!(session.current_section().is_none());
    }

    #[test]
    fn test_drag_commits_translation() {
        let mut session = session(RecordingHost::default());
        session.start(&mut fits(8));

        assert!(session.pointer_down(4));
        assert!(session.pointer_move(6));
        assert_eq!(session.selected_text().as_deref(), Some("d e f"));

        let translation = session.pointer_up();
        assert_eq!(translation.as_deref(), Some("<d e f>"));
        assert_eq!(session.annotation(4), Some("<d e f>"));
        assert_eq!(
            session.host().requests,
            vec![("d e f".to_string(), "en".to_string(), "de".to_string())]
        );
        assert!(session.selection().is_active());
    }

    #[test]
    fn test_tap_without_drag_clears() {
        let mut session = session(RecordingHost::default());
        session.start(&mut fits(8));

        assert!(session.pointer_down(1));
        assert_eq!(session.pointer_up(), None);
        assert!(!session.selection().is_active());
        assert!(session.host().requests.is_empty());
    }

    #[test]
    fn test_page_change_clears_selection() {
        let mut session = session(RecordingHost::default());
        session.start(&mut fits(8));
        session.pointer_down(0);
        session.pointer_move(2);
        assert!(session.selection().is_active());

        session.next_page(&mut fits(8));
        assert!(!session.selection().is_active());
        assert_eq!(session.pointer_up(), None);
    }

    #[test]
    fn test_pointer_outside_window_ignored() {
        let mut session = session(RecordingHost::default());
        session.start(&mut fits(4));
        assert!(!session.pointer_down(9));
        assert!(!session.selection().is_active());
        // Paragraph breaks cannot anchor a selection.
        assert!(!session.pointer_down(3));
    }

    #[test]
    fn test_skip_uses_configured_amount() {
        let mut session = session(RecordingHost::default()).with_skip_amount(3);
        session.start(&mut fits(4));
        // Lands on the break at 7 and moves on to the next paragraph.
        let window = session.skip(Direction::Forward, &mut fits(4));
        assert_eq!(window, PageWindow::new(8, 12));
    }

    #[test]
    fn test_empty_document_session() {
        let mut session = ReadingSession::new(
            Arc::new(TokenizedDocument::default()),
            (),
            "en".into(),
            "en".into(),
        );
        assert_eq!(session.start(&mut fits(10)), PageWindow::default());
        assert_eq!(session.progress_percentage(), 0.0);
        assert!(session.current_section().is_none());
        assert!(!session.pointer_down(0));
    }
}
