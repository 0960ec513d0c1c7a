//! Track identity for the lyrics subsystem.
//!
//! The playback clock itself is owned by the host's audio element; the lyrics
//! engine only ever reads its current position (seconds) on each tick.

use serde::{Deserialize, Serialize};

/// Information about the track whose lyrics should be displayed.
///
/// Structural equality is the track's identity: a track-change event carrying
/// an equal `TrackInfo` is a no-op, and an in-flight lyrics fetch is only
/// committed while the identity it was requested for is still current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Track title
    pub title: String,
    /// Artist name(s)
    pub artist: String,
    /// Track duration in seconds, when the host knows it (used by the lyrics
    /// provider as a disambiguation hint)
    pub duration_secs: Option<u32>,
}

impl TrackInfo {
    /// Create a new track info
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            duration_secs: None,
        }
    }

    /// Set the duration hint
    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}
