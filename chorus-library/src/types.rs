//! Library record shapes.
//!
//! Field names serialize camelCase: the data file is the same JSON document
//! the web client exports and imports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current library data format version
pub const CURRENT_VERSION: u32 = 1;

/// Input shape when saving a track into the library (like, playlist add,
/// history record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    /// Video-platform track ID
    pub track_id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Clock-string duration ("3:45") as shown in search results
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedSong {
    pub id: Uuid,
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub liked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistTrack {
    pub id: Uuid,
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Playlist visibility flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "isPublic")]
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tracks: Vec<PlaylistTrack>,
}

/// Fields to change on an existing playlist; `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub play_count: u32,
    /// First play
    pub played_at: DateTime<Utc>,
    pub last_played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "My Music Library".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// The whole on-device library: one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryData {
    pub version: u32,
    pub profile: Profile,
    pub liked_songs: Vec<LikedSong>,
    pub playlists: Vec<Playlist>,
    pub history: Vec<HistoryEntry>,
}

impl Default for LibraryData {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            profile: Profile::default(),
            liked_songs: Vec::new(),
            playlists: Vec::new(),
            history: Vec::new(),
        }
    }
}
