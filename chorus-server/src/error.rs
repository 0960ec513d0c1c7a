use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("yt-dlp failed: {reason}")]
    Ytdlp { reason: String },

    #[error("no playable stream for video {video_id}")]
    StreamNotFound { video_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
