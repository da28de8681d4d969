use crate::pager::DEFAULT_SKIP_AMOUNT;
use crate::tokenizer::LanguageCode;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CURRENT_VERSION: u32 = 2;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "lexipage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Language the documents are written in; picks the tokenizer backend.
    #[serde(default = "default_content_language")]
    pub content_language: LanguageCode,

    /// Language selections are translated into.
    #[serde(default = "default_target_language")]
    pub target_language: LanguageCode,

    #[serde(default = "default_skip_amount")]
    pub skip_amount: u64,

    #[serde(default = "default_true")]
    pub parallel_extraction: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_content_language() -> LanguageCode {
    LanguageCode::new("en")
}

fn default_target_language() -> LanguageCode {
    LanguageCode::new("en")
}

fn default_skip_amount() -> u64 {
    DEFAULT_SKIP_AMOUNT
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            content_language: default_content_language(),
            target_language: default_target_language(),
            skip_amount: default_skip_amount(),
            parallel_extraction: true,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl ReaderSettings {
    /// Load settings from `path`. A missing or unreadable file yields the
    /// defaults; an outdated file is migrated and written back.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            info!("Settings file {path:?} not found, using defaults");
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<ReaderSettings>(&content) {
                Ok(mut settings) => {
                    debug!("Loaded settings from {path:?}");
                    if settings.version < CURRENT_VERSION {
                        migrate_settings(&mut settings);
                        if let Err(e) = settings.save_to_path(path) {
                            error!("Failed to save migrated settings to {path:?}: {e}");
                        }
                    }
                    settings.sanitize();
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file {path:?}: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Self::default()
            }
        }
    }

    /// Load from the platform config directory, creating the file with
    /// defaults when it does not exist yet.
    pub fn load() -> Self {
        let Some(path) = default_config_path() else {
            warn!("Could not determine config directory, using default settings");
            return Self::default();
        };
        let settings = Self::load_from_path(&path);
        if !path.exists() {
            if let Err(e) = settings.save_to_path(&path) {
                error!("Failed to create settings file {path:?}: {e}");
            }
        }
        settings
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, generate_settings_yaml(self))?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    fn sanitize(&mut self) {
        if self.skip_amount == 0 {
            warn!("skip_amount of 0 would never move, using {DEFAULT_SKIP_AMOUNT}");
            self.skip_amount = DEFAULT_SKIP_AMOUNT;
        }
    }
}

fn migrate_settings(settings: &mut ReaderSettings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // v1 had no parallel_extraction key; the serde default already covers it.

    settings.version = CURRENT_VERSION;
}

fn generate_settings_yaml(settings: &ReaderSettings) -> String {
    let mut content = String::new();

    content.push_str(SETTINGS_HEADER);
    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!(
        "content_language: \"{}\"\n",
        settings.content_language
    ));
    content.push_str(&format!(
        "target_language: \"{}\"\n",
        settings.target_language
    ));
    content.push_str(&format!("skip_amount: {}\n", settings.skip_amount));
    content.push_str(&format!(
        "parallel_extraction: {}\n",
        settings.parallel_extraction
    ));

    content
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# lexipage reader settings
# ============================================================================
# content_language:    language of the books you read (en, de, zh, ja, th, ...)
# target_language:     language selections are translated into
# skip_amount:         tokens moved by a coarse skip
# parallel_extraction: tokenize chapters on all cores while loading

"#;
