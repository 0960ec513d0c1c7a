use chorus_core::{ChorusConfig, CoreError, LyricsProvider};
use chorus_lyrics_lrclib::LrclibProvider;
use std::sync::Arc;
use std::time::Duration;

/// Shared handles for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ChorusConfig>,
    /// Client used to relay upstream audio; no request timeout since streams
    /// stay open for the length of a track.
    pub http: reqwest::Client,
    pub lyrics: Arc<dyn LyricsProvider>,
}

impl AppState {
    /// Build the application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn new(config: ChorusConfig) -> Result<Self, CoreError> {
        let lyrics: Arc<dyn LyricsProvider> =
            Arc::new(LrclibProvider::from_config(&config.lyrics)?);

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            lyrics,
        })
    }
}
