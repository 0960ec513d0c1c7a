pub mod config;
pub mod error;
pub mod lrc;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod time;
pub mod viewer;

pub use config::{
    ChorusConfig, LibraryConfig, LyricsConfig, SearchConfig, ServerConfig, StreamingConfig,
};
pub use error::{CoreError, Result};
pub use lrc::{LinePhase, LyricLine, Timeline};
pub use paths::{
    config_dir, config_path, library_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LIBRARY_FILE_NAME,
};
pub use playback::TrackInfo;
pub use provider::{LyricsDocument, LyricsProvider, LyricsQuery};
pub use viewer::{
    Alignment, DisplayPrefs, DisplayState, LyricsRequest, LyricsViewer, ViewerEvent,
};
