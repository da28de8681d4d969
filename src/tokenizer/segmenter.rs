use super::Script;
use crate::error::TokenizeError;
use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use unicode_segmentation::UnicodeSegmentation;

/// Splits a single line of text into word-like units for scripts that do
/// not mark word boundaries with spaces.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Starts a segmenter for a script. Starting is expensive (dictionary
/// loading), so it is called at most once per script per [`SegmenterCache`].
pub trait SegmenterProvider: Send + Sync {
    fn initialize(&self, script: Script) -> Result<Arc<dyn Segmenter>, String>;
}

/// Process-scoped cache of initialized segmenters.
///
/// The lock is held while a segmenter starts, so concurrent first use of a
/// script waits for the one initialization instead of racing it. A failed
/// initialization is not cached and will be retried by the next call.
pub struct SegmenterCache {
    provider: Arc<dyn SegmenterProvider>,
    ready: Mutex<HashMap<Script, Arc<dyn Segmenter>>>,
}

impl SegmenterCache {
    pub fn new(provider: Arc<dyn SegmenterProvider>) -> Self {
        Self {
            provider,
            ready: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, script: Script) -> Result<Arc<dyn Segmenter>, TokenizeError> {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(segmenter) = ready.get(&script) {
            return Ok(Arc::clone(segmenter));
        }

        info!("Initializing segmenter for {script:?}");
        let started = Instant::now();
        let segmenter = self.provider.initialize(script).map_err(|reason| {
            error!("Segmenter for {script:?} failed to initialize: {reason}");
            TokenizeError::SegmentationBackendUnavailable { script, reason }
        })?;
        debug!(
            "Segmenter for {script:?} ready in {:?}",
            started.elapsed()
        );

        ready.insert(script, Arc::clone(&segmenter));
        Ok(segmenter)
    }

    pub fn is_initialized(&self, script: Script) -> bool {
        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&script)
    }
}

/// Segmenter built on Unicode word boundaries (UAX #29). It has no
/// dictionary: Han and kana come out one character at a time and Thai-like
/// scripts as whole runs. Hosts plug in a real engine through
/// [`SegmenterProvider`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeWordSegmenter;

impl Segmenter for UnicodeWordSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        text.split_word_bounds()
            .filter(|unit| !unit.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeWordProvider;

impl SegmenterProvider for UnicodeWordProvider {
    fn initialize(&self, _script: Script) -> Result<Arc<dyn Segmenter>, String> {
        Ok(Arc::new(UnicodeWordSegmenter))
    }
}
