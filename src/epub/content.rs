use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Plain text of one content unit, with paragraph breaks as `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentText {
    pub text: String,
    /// Element id -> byte offset in `text` where the element's content starts.
    pub anchors: Vec<(String, usize)>,
}

/// Converts (X)HTML content into paragraph-separated text.
///
/// Block-level elements end the current paragraph, inline whitespace is
/// collapsed, and `head`/`script`/`style` are dropped entirely. Every
/// element id is remembered so navigation fragments can be resolved later.
pub struct ContentConverter {
    out: ContentText,
    pending_space: bool,
}

impl ContentConverter {
    pub fn new() -> Self {
        Self {
            out: ContentText::default(),
            pending_space: false,
        }
    }

    pub fn convert(mut self, html: &[u8]) -> std::io::Result<ContentText> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut &html[..])?;
        self.visit_node(&dom.document);
        self.end_paragraph();
        if self.out.text.ends_with('\n') {
            self.out.text.pop();
        }
        Ok(self.out)
    }

    fn visit_node(&mut self, node: &Handle) {
        match node.data {
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                let tag = name.local.as_ref();
                if is_skipped(tag) {
                    return;
                }
                if tag == "br" {
                    self.end_paragraph();
                    return;
                }

                let block = is_block(tag);
                if block {
                    self.end_paragraph();
                }
                if let Some(id) = attrs
                    .borrow()
                    .iter()
                    .find(|attr| attr.name.local.as_ref() == "id")
                {
                    self.flush_space();
                    self.out
                        .anchors
                        .push((id.value.to_string(), self.out.text.len()));
                }
                self.visit_children(node);
                if block {
                    self.end_paragraph();
                }
            }
            NodeData::Text { ref contents } => {
                self.push_text(&contents.borrow());
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: &Handle) {
        for child in node.children.borrow().iter() {
            self.visit_node(child);
        }
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            self.flush_space();
            self.out.text.push(c);
        }
    }

    fn flush_space(&mut self) {
        if self.pending_space && !self.out.text.is_empty() && !self.out.text.ends_with('\n') {
            self.out.text.push(' ');
        }
        self.pending_space = false;
    }

    fn end_paragraph(&mut self) {
        if !self.out.text.is_empty() && !self.out.text.ends_with('\n') {
            self.out.text.push('\n');
        }
        self.pending_space = false;
    }
}

impl Default for ContentConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain text content: only normalizes line endings so every paragraph
/// ends with a single `\n` run.
pub fn plain_text(bytes: &[u8]) -> ContentText {
    ContentText {
        text: String::from_utf8_lossy(bytes).replace("\r\n", "\n"),
        anchors: Vec::new(),
    }
}

fn is_skipped(tag: &str) -> bool {
    matches!(
        tag,
        "head" | "script" | "style" | "title" | "noscript" | "template"
    )
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "aside"
            | "header"
            | "footer"
            | "nav"
            | "blockquote"
            | "pre"
            | "li"
            | "ul"
            | "ol"
            | "dl"
            | "dt"
            | "dd"
            | "table"
            | "tr"
            | "td"
            | "th"
            | "figure"
            | "figcaption"
            | "hr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "body"
    )
}
