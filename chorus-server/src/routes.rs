//! HTTP routes of the music proxy.

use crate::error::ServerError;
use crate::state::AppState;
use crate::ytdlp;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chorus_core::LyricsQuery;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

const LOG_TARGET: &str = "chorus::server::routes";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/music/search", get(search))
        .route("/api/music/stream/{video_id}", get(stream_info))
        .route("/api/music/proxy/{video_id}", get(proxy_stream))
        .route("/api/music/download/{video_id}", get(download))
        .route("/api/music/lyrics", get(lyrics))
        .with_state(state)
}

async fn health() -> Response {
    Json(json!({
        "message": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

/// `GET /api/music/search?q=` - search the video platform for songs.
async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let Some(query) = params.q.filter(|q| !q.trim().is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Query parameter \"q\" is required",
        );
    };

    match ytdlp::search(
        &state.config.streaming.ytdlp_bin,
        &query,
        state.config.search.result_limit,
    )
    .await
    {
        Ok(hits) => Json(hits).into_response(),
        Err(e) => {
            error!(target: LOG_TARGET, "search failed for {query:?}: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to search music")
        }
    }
}

/// `GET /api/music/stream/{video_id}` - hand the client a URL to this
/// server's own proxy, so playback never touches upstream IP checks.
async fn stream_info(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let fallback_host = format!("{}:{}", state.config.server.host, state.config.server.port);
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&fallback_host);

    Json(ytdlp::StreamInfo {
        url: format!("{proto}://{host}/api/music/proxy/{video_id}"),
        mime_type: "audio/webm".to_string(),
        bitrate: 128_000,
    })
    .into_response()
}

/// `GET /api/music/proxy/{video_id}` - resolve the upstream audio URL and
/// relay it, forwarding the client's Range header for seeking.
async fn proxy_stream(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let stream = match ytdlp::resolve_stream(
        &state.config.streaming.ytdlp_bin,
        &state.config.streaming.format,
        &video_id,
    )
    .await
    {
        Ok(stream) => stream,
        Err(ServerError::StreamNotFound { .. }) => {
            return error_response(StatusCode::NOT_FOUND, "Stream not found");
        }
        Err(e) => {
            error!(target: LOG_TARGET, "proxy resolution failed for {video_id}: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut request = state.http.get(&stream.url);
    if let Some(range) = headers.get(header::RANGE) {
        request = request.header(header::RANGE, range.clone());
    }

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            error!(target: LOG_TARGET, "upstream request failed for {video_id}: {e}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        return status.into_response();
    }

    // Forward upstream headers except content-encoding (the body is relayed
    // verbatim, not re-encoded)
    let mut builder = Response::builder().status(status);
    for (name, value) in upstream.headers() {
        if name == header::CONTENT_ENCODING {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|e| {
            error!(target: LOG_TARGET, "failed to build proxy response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    title: Option<String>,
    artist: Option<String>,
}

/// `GET /api/music/download/{video_id}?title=&artist=` - stream the full
/// track as a file attachment.
async fn download(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Response {
    let title = params.title.unwrap_or_else(|| "track".to_string());
    let artist = params.artist.unwrap_or_else(|| "unknown".to_string());

    let stream = match ytdlp::resolve_stream(
        &state.config.streaming.ytdlp_bin,
        &state.config.streaming.format,
        &video_id,
    )
    .await
    {
        Ok(stream) => stream,
        Err(ServerError::StreamNotFound { .. }) => {
            return error_response(StatusCode::NOT_FOUND, "Stream not found");
        }
        Err(e) => {
            error!(target: LOG_TARGET, "download resolution failed for {video_id}: {e}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to download track",
            );
        }
    };

    let upstream = match state.http.get(&stream.url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!(target: LOG_TARGET, "upstream returned {} for download {video_id}", response.status());
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch stream");
        }
        Err(e) => {
            error!(target: LOG_TARGET, "upstream request failed for download {video_id}: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch stream");
        }
    };

    let filename = sanitize_filename(&format!("{title} - {artist}.mp3"));

    Response::builder()
        .header(header::CONTENT_TYPE, stream.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|e| {
            error!(target: LOG_TARGET, "failed to build download response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

#[derive(Debug, Deserialize)]
struct LyricsParams {
    track: Option<String>,
    artist: Option<String>,
    duration: Option<u32>,
}

/// `GET /api/music/lyrics?track=&artist=&duration=` - relay the lyrics
/// provider lookup. A provider miss is 404; a lookup failure is 500 but
/// renders the same way client-side.
async fn lyrics(State(state): State<AppState>, Query(params): Query<LyricsParams>) -> Response {
    let (Some(track), Some(artist)) = (
        params.track.filter(|t| !t.trim().is_empty()),
        params.artist.filter(|a| !a.trim().is_empty()),
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Track and artist parameters are required",
        );
    };

    let mut query = LyricsQuery::new(track, artist);
    if let Some(duration) = params.duration {
        query = query.with_duration(duration);
    }

    match state.lyrics.fetch(&query).await {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Lyrics not found"),
        Err(e) => {
            warn!(
                target: LOG_TARGET,
                "lyrics lookup failed for {} - {}: {e}", query.artist_name, query.track_name
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get lyrics")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Strip characters that are invalid in download filenames.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect()
}
