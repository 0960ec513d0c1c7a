use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChorusConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API (the web client)
    #[serde(default = "default_client_origins")]
    pub client_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    4000
}

fn default_client_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_origins: default_client_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

const fn default_result_limit() -> usize {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// yt-dlp binary to invoke for search and stream resolution
    #[serde(default = "default_ytdlp_bin")]
    pub ytdlp_bin: String,
    /// Format selector passed to yt-dlp when resolving audio streams
    #[serde(default = "default_stream_format")]
    pub format: String,
}

fn default_ytdlp_bin() -> String {
    "yt-dlp".to_string()
}

fn default_stream_format() -> String {
    "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio".to_string()
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            ytdlp_bin: default_ytdlp_bin(),
            format: default_stream_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Base URL of the LRCLIB-compatible lyrics API
    #[serde(default = "default_lyrics_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_lyrics_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_lyrics_timeout")]
    pub timeout_secs: u64,
}

fn default_lyrics_endpoint() -> String {
    "https://lrclib.net/api".to_string()
}

fn default_lyrics_user_agent() -> String {
    "Chorus/0.1 (https://github.com/chorus-player/chorus)".to_string()
}

const fn default_lyrics_timeout() -> u64 {
    10
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_lyrics_endpoint(),
            user_agent: default_lyrics_user_agent(),
            timeout_secs: default_lyrics_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Override for the library data file (defaults to
    /// `~/.config/chorus/library.json`)
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

impl ChorusConfig {
    /// Get the configuration directory path (~/.config/chorus/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/chorus/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// The library data file, honoring the `[library]` override.
    #[must_use]
    pub fn library_path(&self) -> PathBuf {
        self.library
            .data_file
            .clone()
            .unwrap_or_else(crate::paths::library_path)
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if a
    /// field fails validation.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            // Write template config
            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate field values
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when a field value cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.lyrics.endpoint.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.endpoint must not be empty".to_string(),
            });
        }
        if self.streaming.ytdlp_bin.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "streaming.ytdlp_bin must not be empty".to_string(),
            });
        }
        if self.search.result_limit == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "search.result_limit must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# Chorus Configuration
# ~/.config/chorus/config.toml

[server]
host = "127.0.0.1"
port = 4000
# Origins allowed to call the API (your web client)
client_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

[search]
# Maximum number of search results returned per query
result_limit = 20

[streaming]
# yt-dlp binary used for search and audio stream resolution
ytdlp_bin = "yt-dlp"
# Format selector for audio streams (m4a preferred for browser playback)
format = "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio"

[lyrics]
# LRCLIB-compatible lyrics API
endpoint = "https://lrclib.net/api"
user_agent = "Chorus/0.1 (https://github.com/chorus-player/chorus)"
timeout_secs = 10

[library]
# Optional override for the library data file
# data_file = "/path/to/library.json"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config: ChorusConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.search.result_limit, 20);
        assert_eq!(config.lyrics.endpoint, "https://lrclib.net/api");
        assert!(config.library.data_file.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config: ChorusConfig = toml::from_str("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.streaming.ytdlp_bin, "yt-dlp");
    }

    #[test]
    fn test_validation_rejects_empty_endpoint() {
        let config = ChorusConfig {
            lyrics: LyricsConfig {
                endpoint: String::new(),
                ..LyricsConfig::default()
            },
            ..ChorusConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_result_limit() {
        let config = ChorusConfig {
            search: SearchConfig { result_limit: 0 },
            ..ChorusConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
