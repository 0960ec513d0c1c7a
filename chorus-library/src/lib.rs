//! On-device music library for Chorus.
//!
//! Likes, playlists, play history, and the user profile live in one JSON
//! document on disk (by default `~/.config/chorus/library.json`); the store
//! exposes keyed-record CRUD over it. Nothing here talks to the network.

pub mod error;
pub mod store;
pub mod types;

pub use error::{LibraryError, Result};
pub use store::{Library, DEFAULT_HISTORY_LIMIT};
pub use types::{
    HistoryEntry, LibraryData, LikedSong, Playlist, PlaylistTrack, PlaylistUpdate, Profile,
    TrackRecord, Visibility, CURRENT_VERSION,
};
