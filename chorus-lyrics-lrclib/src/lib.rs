//! LRCLIB lyrics provider.
//!
//! Implements the two-step lookup the client contract requires: an exact
//! `/get` query by track + artist (+ duration hint), falling back on 404 to
//! a free-text `/search` whose first hit is taken as-is. Every invocation
//! makes exactly one or two network calls; nothing is cached or retried.

use async_trait::async_trait;
use chorus_core::{CoreError, LyricsConfig, LyricsDocument, LyricsProvider, LyricsQuery, Timeline};
use serde::Deserialize;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "chorus::provider::lrclib";
const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = "Chorus/0.1 (https://github.com/chorus-player/chorus)";

/// LRCLIB.net lyrics provider
pub struct LrclibProvider {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibProvider {
    /// Create a provider against the public LRCLIB API with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_options(LRCLIB_API_URL, DEFAULT_USER_AGENT, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a provider from the `[lyrics]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &LyricsConfig) -> Result<Self, CoreError> {
        Self::with_options(&config.endpoint, &config.user_agent, config.timeout_secs)
    }

    /// Create a provider with an explicit endpoint, user agent, and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_options(
        base_url: &str,
        user_agent: &str,
        timeout_secs: u64,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Free-text fallback: `/search?q=<track> <artist>`, first hit wins.
    async fn search_fallback(
        &self,
        query: &LyricsQuery,
    ) -> Result<Option<LyricsDocument>, CoreError> {
        let search_query = format!("{} {}", query.track_name, query.artist_name);
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&search_query)
        );

        debug!(target: LOG_TARGET, "LRCLIB request URL (search): {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(CoreError::LyricsProviderFailed {
                provider: "lrclib".to_string(),
                reason: format!("search returned status {}", response.status()),
            });
        }

        let results: Vec<LrclibResponse> = response.json().await?;

        match results.into_iter().next() {
            Some(first) => {
                info!(
                    target: LOG_TARGET,
                    "LRCLIB search hit (id: {}, artist: {})", first.id, first.artist_name
                );
                Ok(Some(normalize(first)))
            }
            None => {
                info!(target: LOG_TARGET, "LRCLIB search returned no results");
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct LrclibResponse {
    id: i64,
    #[serde(rename = "trackName")]
    track_name: String,
    #[serde(rename = "artistName")]
    artist_name: String,
    #[serde(rename = "albumName")]
    album_name: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

/// Normalize a raw LRCLIB record into the uniform result shape, running raw
/// synced text through the timeline parser. Applied identically to exact
/// hits and search hits.
fn normalize(response: LrclibResponse) -> LyricsDocument {
    LyricsDocument {
        id: response.id,
        track_name: response.track_name,
        artist_name: response.artist_name,
        album_name: response.album_name.unwrap_or_default(),
        duration_secs: response.duration.unwrap_or(0.0),
        instrumental: response.instrumental,
        plain_lyrics: response.plain_lyrics.filter(|p| !p.is_empty()),
        synced_lyrics: response
            .synced_lyrics
            .filter(|s| !s.is_empty())
            .map(|s| Timeline::parse(&s)),
    }
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<LyricsDocument>, CoreError> {
        info!(
            target: LOG_TARGET,
            "Fetching lyrics for: {} - {} (duration: {:?}s)",
            query.artist_name, query.track_name, query.duration_secs
        );

        let mut url = format!(
            "{}/get?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(&query.track_name),
            urlencoding::encode(&query.artist_name)
        );

        if let Some(duration) = query.duration_secs {
            let _ = write!(url, "&duration={duration}");
        }

        debug!(target: LOG_TARGET, "LRCLIB request URL (exact): {}", url);

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!(target: LOG_TARGET, "LRCLIB exact match not found, trying search");
            return self.search_fallback(query).await;
        }

        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "LRCLIB returned status: {}", response.status());
            return Err(CoreError::LyricsProviderFailed {
                provider: "lrclib".to_string(),
                reason: format!("get returned status {}", response.status()),
            });
        }

        let result: LrclibResponse = response.json().await?;
        info!(target: LOG_TARGET, "LRCLIB exact match (id: {})", result.id);
        Ok(Some(normalize(result)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(synced: Option<&str>, plain: Option<&str>) -> LrclibResponse {
        LrclibResponse {
            id: 99,
            track_name: "Song".to_string(),
            artist_name: "Artist".to_string(),
            album_name: None,
            duration: Some(214.0),
            instrumental: false,
            plain_lyrics: plain.map(str::to_string),
            synced_lyrics: synced.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_parses_synced_text() {
        let doc = normalize(raw(Some("[00:05.00]First\n[00:10.00]Second"), None));
        let timeline = doc.synced_lyrics.unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.lines()[0].time, 5.0);
        assert_eq!(timeline.lines()[0].text, "First");
    }

    #[test]
    fn test_normalize_defaults_missing_fields() {
        let doc = normalize(raw(None, None));
        assert_eq!(doc.album_name, "");
        assert!(!doc.instrumental);
        assert!(doc.plain_lyrics.is_none());
        assert!(doc.synced_lyrics.is_none());
    }

    #[test]
    fn test_normalize_treats_empty_strings_as_absent() {
        let doc = normalize(raw(Some(""), Some("")));
        assert!(doc.synced_lyrics.is_none());
        assert!(doc.plain_lyrics.is_none());
    }

    #[test]
    fn test_search_hit_normalizes_like_exact_hit() {
        // The fallback path must produce the same result shape as the
        // primary lookup for identical provider records.
        let exact = normalize(raw(Some("[00:01.00]line"), Some("line")));
        let from_search = normalize(raw(Some("[00:01.00]line"), Some("line")));
        assert_eq!(exact, from_search);
    }

    #[test]
    fn test_deserializes_lrclib_json() {
        let body = r#"{
            "id": 3396226,
            "trackName": "I Want to Live",
            "artistName": "Borislav Slavov",
            "albumName": "Baldur's Gate 3 (Original Game Soundtrack)",
            "duration": 233,
            "instrumental": false,
            "plainLyrics": "I want to live",
            "syncedLyrics": "[00:17.12]I want to live\n"
        }"#;
        let parsed: LrclibResponse = serde_json::from_str(body).unwrap();
        let doc = normalize(parsed);
        assert_eq!(doc.id, 3_396_226);
        assert_eq!(doc.duration_secs, 233.0);
        assert_eq!(doc.synced_lyrics.unwrap().lines()[0].time, 17.12);
    }

    #[test]
    fn test_deserializes_nullable_fields() {
        let body = r#"{
            "id": 1,
            "trackName": "Quiet Piece",
            "artistName": "Nobody",
            "albumName": null,
            "duration": null,
            "instrumental": true,
            "plainLyrics": null,
            "syncedLyrics": null
        }"#;
        let parsed: LrclibResponse = serde_json::from_str(body).unwrap();
        let doc = normalize(parsed);
        assert!(doc.instrumental);
        assert_eq!(doc.duration_secs, 0.0);
    }
}
