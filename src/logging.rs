use anyhow::{Context, Result};
use simplelog::{Config, LevelFilter, WriteLogger};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "lexipage";

/// Compute the XDG-compliant log file path.
/// Uses `state_dir` on platforms that have it, falls back to `cache_dir`.
pub fn resolve_log_path() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine state or cache directory")?;

    let log_dir = base.join(APP_NAME);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {log_dir:?}"))?;

    Ok(log_dir.join(format!("{APP_NAME}.log")))
}

/// Route the `log` facade into a file. Can only succeed once per process.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create log file {path:?}"))?;
    WriteLogger::init(level, Config::default(), file).context("Logger already initialized")?;
    log::info!("Logging to {path:?} at {level}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_log_path() {
        let log_path = resolve_log_path().unwrap();
        assert!(log_path.ends_with("lexipage.log"));
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    #[serial]
    fn test_init_file_logger_writes_and_refuses_second_init() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reader.log");

        // The logger is process-global.
        if init_file_logger(&path, LevelFilter::Debug).is_ok() {
            log::warn!("hello from the test");
            log::logger().flush();
            let written = fs::read_to_string(&path).unwrap();
            assert!(written.contains("hello from the test"));
        }
        assert!(init_file_logger(&dir.path().join("second.log"), LevelFilter::Info).is_err());
    }
}
