/// CLI configuration lookup.
/// Reads config.json from ~/.config/taskboard/config.json (or platform equivalent).

use std::fs;
use std::path::{Path, PathBuf};

use taskboard_core::TaskboardConfig;

/// Default config path: ~/.config/taskboard/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
        .join("config.json")
}

/// Default data dir: ~/.local/share/taskboard
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
}

/// Load config from path. Returns defaults if the file doesn't exist or
/// can't be parsed.
pub fn load_config(path: &Path) -> TaskboardConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse config {}: {}", path.display(), e);
            TaskboardConfig::default()
        }),
        Err(_) => {
            log::info!("No config at {}, using defaults", path.display());
            TaskboardConfig::default()
        }
    }
}

/// `--data-dir` wins over the config file, which wins over the platform default.
pub fn resolve_data_dir(flag: Option<PathBuf>, config: &TaskboardConfig) -> PathBuf {
    flag.or_else(|| config.data_dir.clone())
        .unwrap_or_else(default_data_dir)
}
