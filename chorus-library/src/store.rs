//! The library store: keyed-record CRUD over one JSON file.
//!
//! Every mutation persists the whole document before returning; reads serve
//! from the in-memory copy.

use crate::error::{LibraryError, Result};
use crate::types::{
    HistoryEntry, LibraryData, LikedSong, Playlist, PlaylistTrack, PlaylistUpdate, Profile,
    TrackRecord, Visibility, CURRENT_VERSION,
};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

const LOG_TARGET: &str = "chorus::library";

/// Default cap on history reads
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// On-device music library backed by a single JSON file.
pub struct Library {
    path: PathBuf,
    data: LibraryData,
}

impl Library {
    /// Open the library at `path`, initializing an empty document when the
    /// file does not exist. An unreadable document is replaced with a fresh
    /// one rather than failing playback features.
    ///
    /// # Errors
    ///
    /// Returns an error when the file or its directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            let library = Self {
                path,
                data: LibraryData::default(),
            };
            library.persist()?;
            return Ok(library);
        }

        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(data) => data,
                Err(e) => {
                    warn!(target: LOG_TARGET, "library file unreadable, starting fresh: {e}");
                    LibraryData::default()
                }
            },
            Err(e) => {
                warn!(target: LOG_TARGET, "failed to read library file, starting fresh: {e}");
                LibraryData::default()
            }
        };

        Ok(Self { path, data })
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    // ---- Liked songs ----

    /// All liked songs, newest first.
    #[must_use]
    pub fn liked_songs(&self) -> Vec<LikedSong> {
        let mut songs = self.data.liked_songs.clone();
        songs.sort_by(|a, b| b.liked_at.cmp(&a.liked_at));
        songs
    }

    /// Like a track.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::AlreadyLiked`] when the track is already in
    /// the liked list, or an IO error when persisting fails.
    pub fn like(&mut self, track: TrackRecord) -> Result<LikedSong> {
        if self.is_liked(&track.track_id) {
            return Err(LibraryError::AlreadyLiked {
                track_id: track.track_id,
            });
        }

        let song = LikedSong {
            id: Uuid::new_v4(),
            track_id: track.track_id,
            title: track.title,
            artist: track.artist,
            thumbnail: track.thumbnail,
            duration: track.duration,
            liked_at: Utc::now(),
        };
        self.data.liked_songs.push(song.clone());
        self.persist()?;
        Ok(song)
    }

    /// Remove a track from the liked list. Unliking an absent track is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an IO error when persisting fails.
    pub fn unlike(&mut self, track_id: &str) -> Result<()> {
        self.data.liked_songs.retain(|s| s.track_id != track_id);
        self.persist()
    }

    #[must_use]
    pub fn is_liked(&self, track_id: &str) -> bool {
        self.data.liked_songs.iter().any(|s| s.track_id == track_id)
    }

    // ---- Playlists ----

    /// All playlists, newest first.
    #[must_use]
    pub fn playlists(&self) -> Vec<Playlist> {
        let mut playlists = self.data.playlists.clone();
        playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        playlists
    }

    #[must_use]
    pub fn playlist(&self, id: Uuid) -> Option<Playlist> {
        self.data.playlists.iter().find(|p| p.id == id).cloned()
    }

    /// Create an empty playlist.
    ///
    /// # Errors
    ///
    /// Returns an IO error when persisting fails.
    pub fn create_playlist(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        visibility: Visibility,
    ) -> Result<Playlist> {
        let now = Utc::now();
        let playlist = Playlist {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            visibility,
            created_at: now,
            updated_at: now,
            tracks: Vec::new(),
        };
        self.data.playlists.push(playlist.clone());
        self.persist()?;
        Ok(playlist)
    }

    /// Apply the non-`None` fields of `update` to a playlist.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::PlaylistNotFound`] for an unknown ID, or an
    /// IO error when persisting fails.
    pub fn update_playlist(&mut self, id: Uuid, update: PlaylistUpdate) -> Result<Playlist> {
        let playlist = self
            .data
            .playlists
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LibraryError::PlaylistNotFound { id })?;

        if let Some(name) = update.name {
            playlist.name = name;
        }
        if let Some(description) = update.description {
            playlist.description = Some(description);
        }
        if let Some(visibility) = update.visibility {
            playlist.visibility = visibility;
        }
        playlist.updated_at = Utc::now();

        let updated = playlist.clone();
        self.persist()?;
        Ok(updated)
    }

    /// Delete a playlist. Deleting an unknown ID is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an IO error when persisting fails.
    pub fn delete_playlist(&mut self, id: Uuid) -> Result<()> {
        self.data.playlists.retain(|p| p.id != id);
        self.persist()
    }

    /// Tracks of a playlist, most recently added first. Empty for an unknown
    /// ID.
    #[must_use]
    pub fn playlist_tracks(&self, id: Uuid) -> Vec<PlaylistTrack> {
        let Some(playlist) = self.data.playlists.iter().find(|p| p.id == id) else {
            return Vec::new();
        };
        let mut tracks = playlist.tracks.clone();
        tracks.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        tracks
    }

    /// Add a track to a playlist.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::PlaylistNotFound`] for an unknown ID, or an
    /// IO error when persisting fails.
    pub fn add_track(&mut self, playlist_id: Uuid, track: TrackRecord) -> Result<PlaylistTrack> {
        let playlist = self
            .data
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(LibraryError::PlaylistNotFound { id: playlist_id })?;

        let entry = PlaylistTrack {
            id: Uuid::new_v4(),
            track_id: track.track_id,
            title: track.title,
            artist: track.artist,
            thumbnail: track.thumbnail,
            duration: track.duration,
            added_at: Utc::now(),
        };
        playlist.tracks.push(entry.clone());
        playlist.updated_at = Utc::now();
        self.persist()?;
        Ok(entry)
    }

    /// Remove every copy of a track from a playlist.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::PlaylistNotFound`] for an unknown ID, or an
    /// IO error when persisting fails.
    pub fn remove_track(&mut self, playlist_id: Uuid, track_id: &str) -> Result<()> {
        let playlist = self
            .data
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(LibraryError::PlaylistNotFound { id: playlist_id })?;

        playlist.tracks.retain(|t| t.track_id != track_id);
        playlist.updated_at = Utc::now();
        self.persist()
    }

    // ---- History ----

    /// The most recent `limit` history entries, latest play first.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let mut entries = self.data.history.clone();
        entries.sort_by(|a, b| b.last_played_at.cmp(&a.last_played_at));
        entries.truncate(limit);
        entries
    }

    /// Record a play: bumps the existing entry's count or inserts a new one.
    ///
    /// # Errors
    ///
    /// Returns an IO error when persisting fails.
    pub fn record_play(&mut self, track: TrackRecord) -> Result<HistoryEntry> {
        let now = Utc::now();

        if let Some(entry) = self
            .data
            .history
            .iter_mut()
            .find(|h| h.track_id == track.track_id)
        {
            entry.play_count = entry.play_count.saturating_add(1);
            entry.last_played_at = now;
            let updated = entry.clone();
            self.persist()?;
            return Ok(updated);
        }

        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            track_id: track.track_id,
            title: track.title,
            artist: track.artist,
            thumbnail: track.thumbnail,
            duration: track.duration,
            play_count: 1,
            played_at: now,
            last_played_at: now,
        };
        self.data.history.push(entry.clone());
        self.persist()?;
        Ok(entry)
    }

    /// Delete one history entry by its record ID.
    ///
    /// # Errors
    ///
    /// Returns an IO error when persisting fails.
    pub fn remove_entry(&mut self, id: Uuid) -> Result<()> {
        self.data.history.retain(|h| h.id != id);
        self.persist()
    }

    // ---- Profile ----

    #[must_use]
    pub fn profile(&self) -> Profile {
        self.data.profile.clone()
    }

    /// Rename the library profile.
    ///
    /// # Errors
    ///
    /// Returns an IO error when persisting fails.
    pub fn rename_profile(&mut self, name: impl Into<String>) -> Result<()> {
        self.data.profile.name = name.into();
        self.persist()
    }

    // ---- Maintenance ----

    /// The whole library as pretty-printed JSON, for file export.
    ///
    /// # Errors
    ///
    /// Returns an encoding error (should not happen for valid data).
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Replace the library with an exported document.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidData`] for a structurally valid
    /// document of an unsupported version, a decode error for anything
    /// malformed, or an IO error when persisting fails.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let data: LibraryData = serde_json::from_str(json)?;
        if data.version == 0 || data.version > CURRENT_VERSION {
            return Err(LibraryError::InvalidData {
                reason: format!("unsupported data version {}", data.version),
            });
        }
        self.data = data;
        self.persist()
    }

    /// Wipe everything back to an empty library.
    ///
    /// # Errors
    ///
    /// Returns an IO error when persisting fails.
    pub fn clear(&mut self) -> Result<()> {
        self.data = LibraryData::default();
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, title: &str) -> TrackRecord {
        TrackRecord {
            track_id: id.to_string(),
            title: title.to_string(),
            artist: "Artist".to_string(),
            thumbnail: Some(format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")),
            duration: Some("3:45".to_string()),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("chorus-library-test-{}.json", Uuid::new_v4()))
    }

    fn temp_library() -> Library {
        Library::open(temp_path()).unwrap()
    }

    #[test]
    fn test_open_initializes_empty_file() {
        let path = temp_path();
        let library = Library::open(&path).unwrap();
        assert!(path.exists());
        assert!(library.liked_songs().is_empty());
        assert!(library.playlists().is_empty());
        assert!(library.history(10).is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_like_unlike_round_trip() {
        let mut library = temp_library();

        library.like(track("abc123", "First")).unwrap();
        assert!(library.is_liked("abc123"));

        // Liking twice is rejected
        assert!(matches!(
            library.like(track("abc123", "First")),
            Err(LibraryError::AlreadyLiked { .. })
        ));

        library.like(track("def456", "Second")).unwrap();
        let songs = library.liked_songs();
        assert_eq!(songs.len(), 2);
        // Newest first
        assert_eq!(songs[0].track_id, "def456");

        library.unlike("abc123").unwrap();
        assert!(!library.is_liked("abc123"));
        assert_eq!(library.liked_songs().len(), 1);
    }

    #[test]
    fn test_playlist_crud() {
        let mut library = temp_library();

        let playlist = library
            .create_playlist("Road Trip", Some("Long drives".to_string()), Visibility::Private)
            .unwrap();
        assert_eq!(library.playlists().len(), 1);

        let updated = library
            .update_playlist(
                playlist.id,
                PlaylistUpdate {
                    name: Some("Road Trip 2".to_string()),
                    visibility: Some(Visibility::Public),
                    ..PlaylistUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Road Trip 2");
        assert_eq!(updated.visibility, Visibility::Public);
        assert_eq!(updated.description, Some("Long drives".to_string()));
        assert!(updated.updated_at >= playlist.updated_at);

        library.add_track(playlist.id, track("abc123", "Song A")).unwrap();
        library.add_track(playlist.id, track("def456", "Song B")).unwrap();
        let tracks = library.playlist_tracks(playlist.id);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].track_id, "def456");

        library.remove_track(playlist.id, "abc123").unwrap();
        assert_eq!(library.playlist_tracks(playlist.id).len(), 1);

        library.delete_playlist(playlist.id).unwrap();
        assert!(library.playlists().is_empty());
        assert!(library.playlist(playlist.id).is_none());
    }

    #[test]
    fn test_unknown_playlist_errors() {
        let mut library = temp_library();
        let missing = Uuid::new_v4();
        assert!(matches!(
            library.add_track(missing, track("x", "X")),
            Err(LibraryError::PlaylistNotFound { .. })
        ));
        assert!(matches!(
            library.update_playlist(missing, PlaylistUpdate::default()),
            Err(LibraryError::PlaylistNotFound { .. })
        ));
        assert!(library.playlist_tracks(missing).is_empty());
    }

    #[test]
    fn test_history_upsert_bumps_play_count() {
        let mut library = temp_library();

        let first = library.record_play(track("abc123", "Song")).unwrap();
        assert_eq!(first.play_count, 1);

        let second = library.record_play(track("abc123", "Song")).unwrap();
        assert_eq!(second.play_count, 2);
        assert_eq!(second.id, first.id);
        assert_eq!(library.history(10).len(), 1);

        library.record_play(track("def456", "Other")).unwrap();
        let entries = library.history(10);
        assert_eq!(entries.len(), 2);
        // Most recent play first
        assert_eq!(entries[0].track_id, "def456");

        // Limit applies after sorting
        assert_eq!(library.history(1).len(), 1);

        library.remove_entry(first.id).unwrap();
        assert_eq!(library.history(10).len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let path = temp_path();
        {
            let mut library = Library::open(&path).unwrap();
            library.like(track("abc123", "Kept")).unwrap();
            library.record_play(track("abc123", "Kept")).unwrap();
        }

        let library = Library::open(&path).unwrap();
        assert!(library.is_liked("abc123"));
        assert_eq!(library.history(10).len(), 1);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut source = temp_library();
        source.like(track("abc123", "Song")).unwrap();
        source
            .create_playlist("Mix", None, Visibility::Private)
            .unwrap();
        let exported = source.export_json().unwrap();

        let mut target = temp_library();
        target.import_json(&exported).unwrap();
        assert!(target.is_liked("abc123"));
        assert_eq!(target.playlists().len(), 1);
    }

    #[test]
    fn test_import_rejects_bad_documents() {
        let mut library = temp_library();
        assert!(library.import_json("not json").is_err());
        assert!(library.import_json("{\"version\": 1}").is_err());

        let data = LibraryData {
            version: 99,
            ..LibraryData::default()
        };
        let json = serde_json::to_string(&data).unwrap();
        assert!(matches!(
            library.import_json(&json),
            Err(LibraryError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut library = temp_library();
        library.like(track("abc123", "Song")).unwrap();
        library.rename_profile("DJ").unwrap();
        assert_eq!(library.profile().name, "DJ");

        library.clear().unwrap();
        assert!(library.liked_songs().is_empty());
        assert_eq!(library.profile().name, "My Music Library");
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let path = temp_path();
        fs::write(&path, "{{{ not json").unwrap();
        let library = Library::open(&path).unwrap();
        assert!(library.liked_songs().is_empty());
        let _ = fs::remove_file(path);
    }
}
