mod config;
pub mod database;
pub mod migrations;

pub use config::{CatalogConfig, Config, LogConfig, StorageConfig};
pub use database::{Database, ProgressRecord, UnlockRecord, User};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the LearnHub data directory, creating it if needed.
///
/// Resolution order:
/// 1. `LEARNHUB_DATA_DIR`, used verbatim
/// 2. `~/.config/learnhub-dev/` when `LEARNHUB_ENV=dev`
/// 3. `~/.config/learnhub/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("LEARNHUB_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("LEARNHUB_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("learnhub-dev")
            } else {
                base_dir.join("learnhub")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
