use crate::error::CoreError;
use crate::lrc::Timeline;
use crate::playback::TrackInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Query parameters for fetching lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    /// Track name
    pub track_name: String,
    /// Artist name
    pub artist_name: String,
    /// Track duration in seconds (disambiguation hint, not enforced)
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            duration_secs: None,
        }
    }

    /// Set the duration hint
    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    /// Build the query for a track-change event
    #[must_use]
    pub fn for_track(track: &TrackInfo) -> Self {
        Self {
            track_name: track.title.clone(),
            artist_name: track.artist.clone(),
            duration_secs: track.duration_secs,
        }
    }
}

/// A normalized lyrics record from a provider lookup.
///
/// Serialized camelCase so the relay endpoint emits the exact JSON shape the
/// web client consumes. The two lyric fields are independent: a record may
/// carry synced lyrics, only plain lyrics, neither (instrumental or empty),
/// or - defensively - both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsDocument {
    /// Provider-side record ID
    pub id: i64,
    pub track_name: String,
    pub artist_name: String,
    /// Empty string when the provider omits the album
    pub album_name: String,
    /// Track duration in seconds as reported by the provider
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    /// Instrumental tracks take display precedence over both lyric fields
    pub instrumental: bool,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<Timeline>,
}

impl LyricsDocument {
    /// Whether the record carries a non-empty synced timeline.
    #[must_use]
    pub fn has_synced(&self) -> bool {
        self.synced_lyrics.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// Whether the record carries non-blank plain lyrics.
    #[must_use]
    pub fn has_plain(&self) -> bool {
        self.plain_lyrics
            .as_ref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}

/// Trait for lyrics providers.
///
/// `Ok(None)` means the provider had no match (after any internal fallback);
/// `Err` means the lookup itself failed (network, unexpected status,
/// malformed body). Consumers present both identically but log them apart.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Fetch lyrics for a query
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails for any reason other than the
    /// provider simply having no match.
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<LyricsDocument>, CoreError>;
}
