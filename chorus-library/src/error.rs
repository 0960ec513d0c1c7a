use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode/decode library data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Song already liked: {track_id}")]
    AlreadyLiked { track_id: String },

    #[error("Playlist not found: {id}")]
    PlaylistNotFound { id: Uuid },

    #[error("Invalid library data: {reason}")]
    InvalidData { reason: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
