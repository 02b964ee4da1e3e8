//! Runtime configuration.
//!
//! Values come from the process environment, after loading a `.env` file
//! if one is present. The config is built once by the binary and passed
//! down by value.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// File backing the persisted sign-in state
    pub kv_path: PathBuf,
    /// Directory exports are written to
    pub export_dir: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            kv_path: PathBuf::from("database/auth-storage.bin.gz"),
            export_dir: PathBuf::from("exports"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` and reads the `ATTENDANCE_*` and `LOG_LEVEL` variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            kv_path: lookup("ATTENDANCE_KV_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.kv_path),
            export_dir: lookup("ATTENDANCE_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}
