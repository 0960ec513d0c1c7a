//! Path constants for configuration and library files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "chorus";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the on-device library data file
pub const LIBRARY_FILE_NAME: &str = "library.json";

/// Get the configuration directory path (~/.config/chorus/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/chorus/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the library data file path (`~/.config/chorus/library.json`)
#[must_use]
pub fn library_path() -> PathBuf {
    config_dir().join(LIBRARY_FILE_NAME)
}
