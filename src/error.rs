use crate::tokenizer::Script;

/// Errors raised while turning text into tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    /// The segmenter for a script could not be started. Tokenization of that
    /// language stops here; there is no fallback to the standard tokenizer.
    #[error("segmentation backend for {script:?} is unavailable: {reason}")]
    SegmentationBackendUnavailable { script: Script, reason: String },
}

/// Errors that abort loading an EPUB archive.
///
/// Only broken top-level structure ends up here. Per-item problems (orphaned
/// manifest entries, bad navigation points) are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("package descriptor not found: {detail}")]
    DescriptorNotFound { detail: String },

    #[error("malformed package descriptor: {detail}")]
    MalformedDescriptor { detail: String },

    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}

impl ExtractionError {
    pub fn descriptor_not_found(detail: impl Into<String>) -> Self {
        Self::DescriptorNotFound {
            detail: detail.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            detail: detail.into(),
        }
    }
}

/// A document with no tokens. Loading one is not a failure by itself;
/// callers that cannot work with an empty document ask for this explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("document has no tokens")]
pub struct EmptyDocument;
