use crate::session::SessionHost;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Where a reader left off in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub ordinal: u64,
    pub percentage: f64,
    pub last_read: DateTime<Utc>,
}

/// Persistence for reading positions, keyed by a document id chosen by the
/// caller (usually the file path).
pub trait ProgressStore {
    fn get(&self, document_id: &str) -> Option<&ProgressEntry>;
    fn update(&mut self, document_id: &str, ordinal: u64, percentage: f64);
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressFile {
    documents: HashMap<String, ProgressEntry>,
    #[serde(skip)]
    file_path: Option<String>,
}

impl ProgressFile {
    pub fn ephemeral() -> Self {
        Self {
            documents: HashMap::new(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: &str) -> Self {
        Self {
            documents: HashMap::new(),
            file_path: Some(file_path.to_string()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&str>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load reading progress from {}: {}", path, e);
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let path = Path::new(file_path);
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut progress: Self = serde_json::from_str(&content)?;
            progress.file_path = Some(file_path.to_string());
            Ok(progress)
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.file_path {
            Some(path) => {
                let content = serde_json::to_string_pretty(self)?;
                fs::write(path, content)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn most_recent(&self) -> Option<(String, &ProgressEntry)> {
        self.documents
            .iter()
            .max_by_key(|(_, entry)| entry.last_read)
            .map(|(id, entry)| (id.clone(), entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProgressEntry)> {
        self.documents.iter()
    }
}

impl ProgressStore for ProgressFile {
    fn get(&self, document_id: &str) -> Option<&ProgressEntry> {
        self.documents.get(document_id)
    }

    fn update(&mut self, document_id: &str, ordinal: u64, percentage: f64) {
        self.documents.insert(
            document_id.to_string(),
            ProgressEntry {
                ordinal,
                percentage,
                last_read: Utc::now(),
            },
        );
        if self.file_path.is_some() {
            if let Err(e) = self.save() {
                log::error!("Failed to save reading progress: {}", e);
            }
        }
    }
}

/// Session host that only persists progress for one document.
pub struct ProgressHost<S: ProgressStore> {
    store: S,
    document_id: String,
}

impl<S: ProgressStore> ProgressHost<S> {
    pub fn new(store: S, document_id: impl Into<String>) -> Self {
        Self {
            store,
            document_id: document_id.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: ProgressStore> SessionHost for ProgressHost<S> {
    fn save_progress(&mut self, ordinal: u64, percentage: f64) {
        self.store.update(&self.document_id, ordinal, percentage);
    }

    fn load_progress(&mut self) -> Option<u64> {
        self.store.get(&self.document_id).map(|entry| entry.ordinal)
    }
}
