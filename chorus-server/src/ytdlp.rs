//! yt-dlp subprocess integration: music search and audio stream resolution.

use crate::error::{Result, ServerError};
use chorus_core::time::format_clock;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

const LOG_TARGET: &str = "chorus::server::ytdlp";

/// Bitrate reported for resolved audio streams
const DEFAULT_BITRATE: u32 = 128_000;

/// A search hit, in the JSON shape the web client renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackHit {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Clock string, e.g. "3:45"
    pub duration: String,
    pub thumbnail: String,
    #[serde(rename = "thumbnailHD")]
    pub thumbnail_hd: String,
}

/// A resolved audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub url: String,
    pub mime_type: String,
    pub bitrate: u32,
}

/// Search the video platform for music via yt-dlp's flat-playlist JSON dump.
///
/// Each stdout line is one JSON object; lines that fail to parse are skipped
/// rather than failing the whole search.
///
/// # Errors
///
/// Returns an error when yt-dlp cannot be run or exits unsuccessfully.
pub async fn search(bin: &str, query: &str, limit: usize) -> Result<Vec<TrackHit>> {
    let target = format!("ytsearch{limit}:{query}");
    debug!(target: LOG_TARGET, "searching: {target}");

    let output = Command::new(bin)
        .args(["--flat-playlist", "--dump-json", "--no-warnings"])
        .arg(&target)
        .output()
        .await?;

    if !output.status.success() {
        return Err(ServerError::Ytdlp {
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut hits: Vec<TrackHit> = stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_search_line)
        .collect();
    hits.truncate(limit);
    Ok(hits)
}

#[derive(Debug, Deserialize)]
struct RawSearchEntry {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

/// Map one dump-json line to a track hit; `None` for unusable lines.
fn parse_search_line(line: &str) -> Option<TrackHit> {
    let entry: RawSearchEntry = serde_json::from_str(line).ok()?;
    let id = entry.id?;
    let thumbnail_hd = hd_thumbnail(&id);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let duration_secs = entry
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.round().min(f64::from(u32::MAX)) as u32);

    Some(TrackHit {
        title: entry.title.unwrap_or_else(|| "Unknown Title".to_string()),
        artist: entry
            .uploader
            .or(entry.channel)
            .unwrap_or_else(|| "Unknown Artist".to_string()),
        duration: duration_secs.map_or_else(|| "0:00".to_string(), format_clock),
        thumbnail: entry.thumbnail.unwrap_or_else(|| thumbnail_hd.clone()),
        thumbnail_hd,
        id,
    })
}

/// HD thumbnail URL for a video
#[must_use]
pub fn hd_thumbnail(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

/// Resolve the direct audio URL for a video, preferring the configured
/// format and retrying once with `best` before giving up.
///
/// # Errors
///
/// Returns [`ServerError::StreamNotFound`] when neither attempt yields a
/// usable URL.
pub async fn resolve_stream(bin: &str, format: &str, video_id: &str) -> Result<StreamInfo> {
    let watch_url = format!("https://www.youtube.com/watch?v={video_id}");

    match run_resolver(bin, format, &watch_url).await {
        Ok(url) => Ok(StreamInfo {
            mime_type: sniff_mime(&url).to_string(),
            url,
            bitrate: DEFAULT_BITRATE,
        }),
        Err(e) => {
            warn!(target: LOG_TARGET, "stream resolution failed for {video_id}, retrying with best: {e}");
            let url = run_resolver(bin, "best", &watch_url)
                .await
                .map_err(|_| ServerError::StreamNotFound {
                    video_id: video_id.to_string(),
                })?;
            Ok(StreamInfo {
                url,
                mime_type: "video/mp4".to_string(),
                bitrate: DEFAULT_BITRATE,
            })
        }
    }
}

async fn run_resolver(bin: &str, format: &str, watch_url: &str) -> Result<String> {
    let output = Command::new(bin)
        .args(["-f", format, "-g", "--no-warnings", "--no-playlist"])
        .arg(watch_url)
        .output()
        .await?;

    if !output.status.success() {
        return Err(ServerError::Ytdlp {
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let url = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ServerError::Ytdlp {
            reason: "empty output".to_string(),
        })?;

    if !url.starts_with("http") {
        return Err(ServerError::Ytdlp {
            reason: format!("unexpected output: {url}"),
        });
    }

    Ok(url.to_string())
}

/// Detect the mime type from a resolved googlevideo URL.
fn sniff_mime(url: &str) -> &'static str {
    if url.contains("mime=audio%2Fwebm") || url.contains("mime=audio/webm") {
        "audio/webm"
    } else {
        "audio/mp4"
    }
}
