//! Per-instance lyrics view controller.
//!
//! Each panel that displays lyrics (the compact side panel, the fullscreen
//! view) owns one [`LyricsViewer`]. Instances consume the same upstream
//! signals - track changes and playback-clock ticks - but keep their own
//! fetch lifecycle and display preferences, so any number of them can run
//! concurrently and deterministically resolve the same active line.

use crate::error::CoreError;
use crate::lrc::Timeline;
use crate::playback::TrackInfo;
use crate::provider::{LyricsDocument, LyricsProvider, LyricsQuery};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "chorus::viewer";

/// Font scale bounds and step for the display preference controls.
pub const MIN_FONT_SCALE: f64 = 0.6;
pub const MAX_FONT_SCALE: f64 = 1.8;
pub const FONT_SCALE_STEP: f64 = 0.2;

/// Horizontal text alignment preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Local display preferences. Ephemeral: never persisted, never affecting
/// fetch or resolution state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPrefs {
    pub font_scale: f64,
    pub alignment: Alignment,
    pub expanded: bool,
}

impl Default for DisplayPrefs {
    fn default() -> Self {
        Self {
            font_scale: 1.0,
            alignment: Alignment::default(),
            expanded: false,
        }
    }
}

/// What the panel should currently render.
///
/// `Failed` and `NotFound` carry the same user-facing copy ("lyrics not
/// found / failed to load") but stay distinct states so logs and tests can
/// tell them apart.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DisplayState {
    /// No track selected
    #[default]
    NoTrack,
    /// Fetch in flight for the current track
    Loading,
    /// The lookup itself failed (network or provider error)
    Failed,
    /// Provider had no match for this track
    NotFound,
    /// Provider flagged the track as instrumental
    Instrumental,
    /// Timed lyrics ready for clock-driven highlighting
    Synced(Timeline),
    /// Plain lyrics only, no timing
    Plain(String),
}

impl DisplayState {
    /// Classify a fetched document, applying display precedence:
    /// instrumental over synced over plain over nothing. Blank or empty
    /// lyric fields are treated as absent.
    fn from_document(doc: LyricsDocument) -> Self {
        if doc.instrumental {
            return Self::Instrumental;
        }
        if let Some(timeline) = doc.synced_lyrics.filter(|t| !t.is_empty()) {
            return Self::Synced(timeline);
        }
        if let Some(plain) = doc.plain_lyrics.filter(|p| !p.trim().is_empty()) {
            return Self::Plain(plain);
        }
        Self::NotFound
    }
}

/// Events emitted by a viewer for its presentation layer.
#[derive(Debug, Clone)]
pub enum ViewerEvent {
    /// The display state was replaced (track change or fetch completion)
    StateChanged(DisplayState),
    /// The active line moved; the presentation layer scrolls `current` into
    /// view
    ActiveLineChanged {
        previous: Option<usize>,
        current: Option<usize>,
    },
}

/// A pending lyrics lookup, keyed to the track generation it was issued for.
///
/// The generation is the stale-response guard: by the time a response
/// arrives, [`LyricsViewer::complete_fetch`] only commits it if no newer
/// track change has bumped the counter.
#[derive(Debug, Clone)]
pub struct LyricsRequest {
    pub generation: u64,
    pub query: LyricsQuery,
}

struct ViewerInner {
    generation: u64,
    track: Option<TrackInfo>,
    state: DisplayState,
    active_index: Option<usize>,
    prefs: DisplayPrefs,
}

/// Lyrics view controller: fetch lifecycle, active-line tracking, and
/// display preferences for one lyrics panel.
pub struct LyricsViewer {
    inner: RwLock<ViewerInner>,
    events: broadcast::Sender<ViewerEvent>,
}

impl LyricsViewer {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(ViewerInner {
                generation: 0,
                track: None,
                state: DisplayState::NoTrack,
                active_index: None,
                prefs: DisplayPrefs::default(),
            }),
            events,
        }
    }

    /// Subscribe to viewer events
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.events.subscribe()
    }

    /// Handle a track-change signal.
    ///
    /// An unchanged identity is a no-op. Otherwise any in-flight fetch is
    /// invalidated, the active line resets, and - for a non-null track - a
    /// [`LyricsRequest`] is returned for the caller to run (see
    /// [`Self::spawn_fetch`]).
    pub fn set_track(&self, track: Option<TrackInfo>) -> Option<LyricsRequest> {
        let mut inner = self.inner.write();
        if inner.track == track {
            return None;
        }

        inner.generation = inner.generation.wrapping_add(1);
        inner.active_index = None;
        inner.track = track;

        let (state, request) = match inner.track.as_ref() {
            None => (DisplayState::NoTrack, None),
            Some(track) => (
                DisplayState::Loading,
                Some(LyricsRequest {
                    generation: inner.generation,
                    query: LyricsQuery::for_track(track),
                }),
            ),
        };
        inner.state = state.clone();
        drop(inner);

        let _ = self.events.send(ViewerEvent::StateChanged(state));
        request
    }

    /// Commit the outcome of a lyrics lookup.
    ///
    /// Returns false (and changes nothing) when `generation` no longer
    /// matches the latest track change - a late response for a previous
    /// track must never reach the display.
    pub fn complete_fetch(
        &self,
        generation: u64,
        outcome: Result<Option<LyricsDocument>, CoreError>,
    ) -> bool {
        let mut inner = self.inner.write();
        if generation != inner.generation {
            debug!(
                target: LOG_TARGET,
                generation,
                current = inner.generation,
                "discarding lyrics response for a stale track"
            );
            return false;
        }
        let Some(track) = inner.track.clone() else {
            return false;
        };

        // NotFound and failures render the same message; only the logs
        // distinguish them.
        let state = match outcome {
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    "lyrics fetch failed for {} - {}: {e}", track.artist, track.title
                );
                DisplayState::Failed
            }
            Ok(None) => {
                info!(
                    target: LOG_TARGET,
                    "no lyrics found for {} - {}", track.artist, track.title
                );
                DisplayState::NotFound
            }
            Ok(Some(doc)) => DisplayState::from_document(doc),
        };

        inner.active_index = None;
        inner.state = state.clone();
        drop(inner);

        let _ = self.events.send(ViewerEvent::StateChanged(state));
        true
    }

    /// Run a lyrics request against `provider` in a background task and
    /// commit the result. Completion reports whether the result was
    /// committed or discarded as stale.
    pub fn spawn_fetch(
        self: &Arc<Self>,
        provider: Arc<dyn LyricsProvider>,
        request: LyricsRequest,
    ) -> tokio::task::JoinHandle<bool> {
        let viewer = Arc::clone(self);
        tokio::spawn(async move {
            debug!(
                target: LOG_TARGET,
                provider = provider.name(),
                track = %request.query.track_name,
                artist = %request.query.artist_name,
                "fetching lyrics"
            );
            let outcome = provider.fetch(&request.query).await;
            viewer.complete_fetch(request.generation, outcome)
        })
    }

    /// Handle a playback-clock tick (seconds).
    ///
    /// Cheap and synchronous: a no-op unless synced lyrics are loaded, and
    /// an O(log n) index resolution otherwise. Emits
    /// [`ViewerEvent::ActiveLineChanged`] when the index moves.
    pub fn tick(&self, position: f64) {
        let mut inner = self.inner.write();
        let current = match &inner.state {
            DisplayState::Synced(timeline) => timeline.active_index(position),
            _ => return,
        };
        if current == inner.active_index {
            return;
        }
        let previous = inner.active_index;
        inner.active_index = current;
        drop(inner);

        let _ = self
            .events
            .send(ViewerEvent::ActiveLineChanged { previous, current });
    }

    /// Snapshot of the current display state
    #[must_use]
    pub fn display(&self) -> DisplayState {
        self.inner.read().state.clone()
    }

    /// The currently resolved active line index
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.inner.read().active_index
    }

    /// The current track identity
    #[must_use]
    pub fn track(&self) -> Option<TrackInfo> {
        self.inner.read().track.clone()
    }

    /// Snapshot of the display preferences
    #[must_use]
    pub fn prefs(&self) -> DisplayPrefs {
        self.inner.read().prefs
    }

    /// Increase the font scale by one step, returning the new value
    pub fn increase_font_scale(&self) -> f64 {
        let mut inner = self.inner.write();
        inner.prefs.font_scale = clamp_scale(inner.prefs.font_scale + FONT_SCALE_STEP);
        inner.prefs.font_scale
    }

    /// Decrease the font scale by one step, returning the new value
    pub fn decrease_font_scale(&self) -> f64 {
        let mut inner = self.inner.write();
        inner.prefs.font_scale = clamp_scale(inner.prefs.font_scale - FONT_SCALE_STEP);
        inner.prefs.font_scale
    }

    /// Set the text alignment
    pub fn set_alignment(&self, alignment: Alignment) {
        self.inner.write().prefs.alignment = alignment;
    }

    /// Toggle the expanded layout, returning the new value
    pub fn toggle_expanded(&self) -> bool {
        let mut inner = self.inner.write();
        inner.prefs.expanded = !inner.prefs.expanded;
        inner.prefs.expanded
    }
}

impl Default for LyricsViewer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp to [`MIN_FONT_SCALE`, `MAX_FONT_SCALE`] and round to one decimal so
/// repeated steps land on exact stops.
fn clamp_scale(value: f64) -> f64 {
    (value.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    fn track_a() -> TrackInfo {
        TrackInfo::new("Paranoid", "Black Sabbath").with_duration(170)
    }

    fn track_b() -> TrackInfo {
        TrackInfo::new("War Pigs", "Black Sabbath").with_duration(478)
    }

    fn synced_doc(track: &TrackInfo, lrc: &str) -> LyricsDocument {
        LyricsDocument {
            id: 1,
            track_name: track.title.clone(),
            artist_name: track.artist.clone(),
            album_name: String::new(),
            duration_secs: 170.0,
            instrumental: false,
            plain_lyrics: None,
            synced_lyrics: Some(Timeline::parse(lrc)),
        }
    }

    /// Provider returning a fixed outcome after an optional delay.
    struct StaticProvider {
        doc: Option<LyricsDocument>,
        delay: Duration,
    }

    #[async_trait]
    impl LyricsProvider for StaticProvider {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch(&self, _query: &LyricsQuery) -> Result<Option<LyricsDocument>, CoreError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.doc.clone())
        }
    }

    #[test]
    fn test_starts_with_no_track() {
        let viewer = LyricsViewer::new();
        assert_eq!(viewer.display(), DisplayState::NoTrack);
        assert_eq!(viewer.active_index(), None);
    }

    #[test]
    fn test_track_change_enters_loading_with_request() {
        let viewer = LyricsViewer::new();
        let request = viewer.set_track(Some(track_a())).unwrap();
        assert_eq!(viewer.display(), DisplayState::Loading);
        assert_eq!(request.query.track_name, "Paranoid");
        assert_eq!(request.query.duration_secs, Some(170));
    }

    #[test]
    fn test_null_track_returns_to_no_track_without_request() {
        let viewer = LyricsViewer::new();
        viewer.set_track(Some(track_a()));
        assert!(viewer.set_track(None).is_none());
        assert_eq!(viewer.display(), DisplayState::NoTrack);
        assert_eq!(viewer.track(), None);
    }

    #[test]
    fn test_unchanged_track_is_noop() {
        let viewer = LyricsViewer::new();
        let first = viewer.set_track(Some(track_a())).unwrap();
        assert!(viewer.set_track(Some(track_a())).is_none());
        // The original request is still current
        assert!(viewer.complete_fetch(first.generation, Ok(None)));
    }

    #[test]
    fn test_stale_response_discarded_after_track_change() {
        let viewer = LyricsViewer::new();
        let request_a = viewer.set_track(Some(track_a())).unwrap();
        let request_b = viewer.set_track(Some(track_b())).unwrap();

        // A's late response arrives after B became current
        let committed = viewer.complete_fetch(
            request_a.generation,
            Ok(Some(synced_doc(&track_a(), "[00:01]wrong track"))),
        );
        assert!(!committed);
        assert_eq!(viewer.display(), DisplayState::Loading);

        let committed = viewer.complete_fetch(
            request_b.generation,
            Ok(Some(synced_doc(&track_b(), "[00:01]right track"))),
        );
        assert!(committed);
        let DisplayState::Synced(timeline) = viewer.display() else {
            panic!("expected synced state");
        };
        assert_eq!(timeline.lines()[0].text, "right track");
    }

    #[test]
    fn test_stale_response_discarded_after_track_cleared() {
        let viewer = LyricsViewer::new();
        let request = viewer.set_track(Some(track_a())).unwrap();
        viewer.set_track(None);

        assert!(!viewer.complete_fetch(
            request.generation,
            Ok(Some(synced_doc(&track_a(), "[00:01]late")))
        ));
        assert_eq!(viewer.display(), DisplayState::NoTrack);
    }

    #[test]
    fn test_display_precedence() {
        let viewer = LyricsViewer::new();
        let base = |track: &TrackInfo| LyricsDocument {
            id: 7,
            track_name: track.title.clone(),
            artist_name: track.artist.clone(),
            album_name: String::new(),
            duration_secs: 100.0,
            instrumental: false,
            plain_lyrics: None,
            synced_lyrics: None,
        };

        // Instrumental wins over both lyric fields
        let request = viewer.set_track(Some(track_a())).unwrap();
        let mut doc = base(&track_a());
        doc.instrumental = true;
        doc.plain_lyrics = Some("words".to_string());
        doc.synced_lyrics = Some(Timeline::parse("[00:01]words"));
        viewer.complete_fetch(request.generation, Ok(Some(doc)));
        assert_eq!(viewer.display(), DisplayState::Instrumental);

        // Synced wins over plain
        let request = viewer.set_track(Some(track_b())).unwrap();
        let mut doc = base(&track_b());
        doc.plain_lyrics = Some("plain words".to_string());
        doc.synced_lyrics = Some(Timeline::parse("[00:01]timed words"));
        viewer.complete_fetch(request.generation, Ok(Some(doc)));
        assert!(matches!(viewer.display(), DisplayState::Synced(_)));

        // Plain only
        let request = viewer.set_track(Some(track_a())).unwrap();
        let mut doc = base(&track_a());
        doc.plain_lyrics = Some("plain words".to_string());
        viewer.complete_fetch(request.generation, Ok(Some(doc)));
        assert_eq!(
            viewer.display(),
            DisplayState::Plain("plain words".to_string())
        );

        // Neither field: not found
        let request = viewer.set_track(Some(track_b())).unwrap();
        viewer.complete_fetch(request.generation, Ok(Some(base(&track_b()))));
        assert_eq!(viewer.display(), DisplayState::NotFound);
    }

    #[test]
    fn test_fetch_failure_becomes_failed_state() {
        let viewer = LyricsViewer::new();
        let request = viewer.set_track(Some(track_a())).unwrap();
        let committed = viewer.complete_fetch(
            request.generation,
            Err(CoreError::LyricsProviderFailed {
                provider: "lrclib".to_string(),
                reason: "status 500".to_string(),
            }),
        );
        assert!(committed);
        assert_eq!(viewer.display(), DisplayState::Failed);
    }

    #[test]
    fn test_tick_is_noop_without_synced_lyrics() {
        let viewer = LyricsViewer::new();
        viewer.tick(12.0);
        assert_eq!(viewer.active_index(), None);

        viewer.set_track(Some(track_a()));
        viewer.tick(12.0);
        assert_eq!(viewer.active_index(), None);
        assert_eq!(viewer.display(), DisplayState::Loading);
    }

    #[test]
    fn test_tick_resolves_and_emits_active_line_changes() {
        let viewer = LyricsViewer::new();
        let request = viewer.set_track(Some(track_a())).unwrap();
        viewer.complete_fetch(
            request.generation,
            Ok(Some(synced_doc(&track_a(), "[00:05]a\n[00:10]b"))),
        );

        let mut events = viewer.subscribe();

        viewer.tick(1.0);
        assert_eq!(viewer.active_index(), None);
        assert!(events.try_recv().is_err());

        viewer.tick(6.0);
        assert_eq!(viewer.active_index(), Some(0));
        assert!(matches!(
            events.try_recv(),
            Ok(ViewerEvent::ActiveLineChanged {
                previous: None,
                current: Some(0),
            })
        ));

        // Same index: no repeat event
        viewer.tick(7.5);
        assert!(events.try_recv().is_err());

        viewer.tick(11.0);
        assert!(matches!(
            events.try_recv(),
            Ok(ViewerEvent::ActiveLineChanged {
                previous: Some(0),
                current: Some(1),
            })
        ));
    }

    #[test]
    fn test_two_viewers_resolve_identically_with_independent_prefs() {
        let panel = LyricsViewer::new();
        let fullscreen = LyricsViewer::new();
        let doc = synced_doc(&track_a(), "[00:02]a\n[00:04]b\n[00:08]c");

        for viewer in [&panel, &fullscreen] {
            let request = viewer.set_track(Some(track_a())).unwrap();
            viewer.complete_fetch(request.generation, Ok(Some(doc.clone())));
        }

        // Diverge the preferences only
        panel.increase_font_scale();
        panel.set_alignment(Alignment::Left);
        fullscreen.toggle_expanded();

        for clock in [0.0, 2.0, 3.0, 4.5, 7.99, 8.0, 20.0] {
            panel.tick(clock);
            fullscreen.tick(clock);
            assert_eq!(panel.active_index(), fullscreen.active_index());
        }

        assert_ne!(panel.prefs(), fullscreen.prefs());
    }

    #[test]
    fn test_font_scale_clamps_at_bounds() {
        let viewer = LyricsViewer::new();
        for _ in 0..10 {
            viewer.increase_font_scale();
        }
        assert_eq!(viewer.prefs().font_scale, MAX_FONT_SCALE);

        for _ in 0..10 {
            viewer.decrease_font_scale();
        }
        assert_eq!(viewer.prefs().font_scale, MIN_FONT_SCALE);

        assert_eq!(viewer.increase_font_scale(), 0.8);
    }

    #[test]
    fn test_prefs_do_not_touch_fetch_state() {
        let viewer = LyricsViewer::new();
        let request = viewer.set_track(Some(track_a())).unwrap();
        viewer.increase_font_scale();
        viewer.set_alignment(Alignment::Right);
        viewer.toggle_expanded();
        assert_eq!(viewer.display(), DisplayState::Loading);
        assert!(viewer.complete_fetch(request.generation, Ok(None)));
    }

    #[tokio::test]
    async fn test_spawn_fetch_commits_result() {
        let viewer = Arc::new(LyricsViewer::new());
        let provider: Arc<dyn LyricsProvider> = Arc::new(StaticProvider {
            doc: Some(synced_doc(&track_a(), "[00:01]hello")),
            delay: Duration::ZERO,
        });

        let request = viewer.set_track(Some(track_a())).unwrap();
        let committed = viewer.spawn_fetch(provider, request).await.unwrap();
        assert!(committed);
        assert!(matches!(viewer.display(), DisplayState::Synced(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_for_previous_track_never_wins() {
        let viewer = Arc::new(LyricsViewer::new());
        let slow: Arc<dyn LyricsProvider> = Arc::new(StaticProvider {
            doc: Some(synced_doc(&track_a(), "[00:01]from track a")),
            delay: Duration::from_secs(30),
        });
        let fast: Arc<dyn LyricsProvider> = Arc::new(StaticProvider {
            doc: Some(synced_doc(&track_b(), "[00:01]from track b")),
            delay: Duration::ZERO,
        });

        let request_a = viewer.set_track(Some(track_a())).unwrap();
        let slow_task = viewer.spawn_fetch(slow, request_a);

        // Track changes while A's fetch is still in flight
        let request_b = viewer.set_track(Some(track_b())).unwrap();
        let fast_task = viewer.spawn_fetch(fast, request_b);

        assert!(fast_task.await.unwrap());
        assert!(!slow_task.await.unwrap());

        let DisplayState::Synced(timeline) = viewer.display() else {
            panic!("expected synced state");
        };
        assert_eq!(timeline.lines()[0].text, "from track b");
    }
}
