//! Paged reading core: tokenizes text and EPUB packages into an ordinal
//! token stream, cuts it into paragraph-atomic pages and tracks in-page
//! selections for translation lookup.

pub mod document;
pub mod epub;
pub mod error;
pub mod logging;
pub mod pager;
pub mod progress;
pub mod selection;
pub mod session;
pub mod settings;
pub mod tokenizer;

pub use document::{
    ChunkDescriptor, DocumentMetadata, SectionNode, Token, TokenKind, TokenizedDocument,
};
pub use error::{EmptyDocument, ExtractionError, TokenizeError};
pub use pager::{CapacityOracle, Direction, PageWindow, Pager, WindowOracle};
pub use progress::{ProgressEntry, ProgressFile, ProgressHost, ProgressStore};
pub use selection::{Selection, SelectionRange};
pub use session::{ReadingSession, SessionHost};
pub use settings::ReaderSettings;
pub use tokenizer::{Backend, LanguageCode, Script, Tokenizer};
