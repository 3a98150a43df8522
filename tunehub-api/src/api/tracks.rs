//! Track catalog endpoints: upload, listing, analysis, streaming, artwork

use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::auth::CurrentUser;
use crate::db::tracks::{self, AnalysisFields, Track};
use crate::error::{ApiError, ApiResult};
use crate::services::{UploadRequest, UploadedFile};
use crate::AppState;

/// Analysis view of a track; unset fields serialize as null
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub track_id: i64,
    #[serde(flatten)]
    pub analysis: AnalysisFields,
}

#[derive(Debug, Serialize)]
pub struct AnalysisQueuedResponse {
    pub track_id: i64,
    pub status: &'static str,
}

/// Build track routes
///
/// `upload_limit` caps the multipart body of the upload route.
pub fn track_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/songs/upload",
            post(upload_track).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/songs", get(list_tracks))
        .route("/api/songs/:id", get(get_track))
        .route(
            "/api/songs/:id/analysis",
            get(get_analysis).post(reanalyze_track),
        )
        .route("/api/songs/:id/stream", get(stream_track))
        .route("/api/songs/:id/artwork", get(get_artwork))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

async fn load_track(state: &AppState, id: i64) -> ApiResult<Track> {
    tracks::get_track(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Track {} not found", id)))
}

/// Missing blobs surface as 404 rather than 500
fn blob_error(path: &str, err: std::io::Error) -> ApiError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ApiError::NotFound(format!("Stored file missing: {}", path))
    } else {
        ApiError::Io(err)
    }
}

/// POST /api/songs/upload
///
/// Multipart fields: `file` (required), `artwork`, `title`, `artist`, `album`.
/// Analysis is queued after the record exists and runs after the response.
pub async fn upload_track(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Track>)> {
    let mut audio = None;
    let mut artwork = None;
    let mut title = None;
    let mut artist = None;
    let mut album = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "artwork" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                let part = UploadedFile { filename, bytes };
                if name == "file" {
                    audio = Some(part);
                } else if part.filename.as_deref().is_some_and(|f| !f.is_empty())
                    || !part.bytes.is_empty()
                {
                    // browsers send an empty, unnamed part when no image was chosen
                    artwork = Some(part);
                }
            }
            "title" => title = Some(field.text().await.map_err(multipart_error)?),
            "artist" => artist = Some(field.text().await.map_err(multipart_error)?),
            "album" => album = Some(field.text().await.map_err(multipart_error)?),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    let audio =
        audio.ok_or_else(|| ApiError::BadRequest("missing 'file' field".to_string()))?;

    let request = UploadRequest {
        audio,
        artwork,
        title,
        artist,
        album,
        uploaded_by: user_id,
    };

    let track = state.intake.ingest(request).await.map_err(|e| {
        tracing::info!(uploaded_by = user_id, reason = %e, "Upload rejected");
        ApiError::from(e)
    })?;

    // fire-and-forget; the outcome is logged by the analyzer
    drop(state.analyzer.dispatch(track.id, &track.audio_path));

    Ok((StatusCode::CREATED, Json(track)))
}

/// GET /api/songs
pub async fn list_tracks(State(state): State<AppState>) -> ApiResult<Json<Vec<Track>>> {
    Ok(Json(tracks::list_tracks(&state.db).await?))
}

/// GET /api/songs/:id
pub async fn get_track(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Track>> {
    Ok(Json(load_track(&state, id).await?))
}

/// GET /api/songs/:id/analysis
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AnalysisResponse>> {
    let track = load_track(&state, id).await?;
    Ok(Json(AnalysisResponse {
        track_id: track.id,
        analysis: track.analysis,
    }))
}

/// POST /api/songs/:id/analysis
///
/// Re-runs analysis; a successful run overwrites every analysis field.
pub async fn reanalyze_track(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<AnalysisQueuedResponse>)> {
    let track = load_track(&state, id).await?;

    tracing::info!(track_id = id, requested_by = user_id, "Re-analysis requested");
    drop(state.analyzer.dispatch(track.id, &track.audio_path));

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisQueuedResponse {
            track_id: track.id,
            status: "queued",
        }),
    ))
}

/// Requested byte range, resolved against the resource length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable Range header; serve everything
    Full,
    /// Inclusive start and end offsets
    Partial(u64, u64),
    Unsatisfiable,
}

/// Parse a single `bytes=` range
///
/// Malformed or multi-range headers are ignored (full response), matching how
/// servers are allowed to treat Range.
pub fn parse_range(header: Option<&str>, len: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // suffix range: last n bytes
        return match end.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if len == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial(len.saturating_sub(n), len - 1),
            Err(_) => ByteRange::Full,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= len {
        return ByteRange::Unsatisfiable;
    }
    let last = len - 1;
    ByteRange::Partial(start, end.map_or(last, |e| e.min(last)))
}

fn audio_content_type(path: &str) -> &'static str {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "aiff" | "aif" => "audio/aiff",
        "wma" => "audio/x-ms-wma",
        _ => "application/octet-stream",
    }
}

/// GET /api/songs/:id/stream
pub async fn stream_track(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let track = load_track(&state, id).await?;
    let path = track.audio_path.as_str();
    let len = state
        .store
        .len(path)
        .await
        .map_err(|e| blob_error(path, e))?;

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let content_type = HeaderValue::from_static(audio_content_type(path));

    match parse_range(range_header, len) {
        ByteRange::Unsatisfiable => Err(ApiError::RangeNotSatisfiable { len }),
        ByteRange::Full => {
            let absolute = state.store.resolve(path)?;
            let bytes = tokio::fs::read(&absolute)
                .await
                .map_err(|e| blob_error(path, e))?;
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                ],
                Body::from(bytes),
            )
                .into_response())
        }
        ByteRange::Partial(start, end) => {
            let bytes = state
                .store
                .read_range(path, start, end)
                .await
                .map_err(|e| blob_error(path, e))?;
            let content_range = format!("bytes {}-{}/{}", start, end, len);
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (
                        header::CONTENT_RANGE,
                        HeaderValue::from_str(&content_range)
                            .map_err(|e| ApiError::Internal(e.to_string()))?,
                    ),
                ],
                Body::from(bytes),
            )
                .into_response())
        }
    }
}

/// GET /api/songs/:id/artwork
pub async fn get_artwork(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let track = load_track(&state, id).await?;
    let path = track
        .artwork_path
        .ok_or_else(|| ApiError::NotFound(format!("Track {} has no artwork", id)))?;

    let absolute = state.store.resolve(&path)?;
    let bytes = tokio::fs::read(&absolute)
        .await
        .map_err(|e| blob_error(&path, e))?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"))],
        Body::from(bytes),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range(None, 100), ByteRange::Full);
        assert_eq!(parse_range(Some("bytes=0-9"), 100), ByteRange::Partial(0, 9));
        assert_eq!(parse_range(Some("bytes=90-"), 100), ByteRange::Partial(90, 99));
        assert_eq!(parse_range(Some("bytes=-10"), 100), ByteRange::Partial(90, 99));
        assert_eq!(parse_range(Some("bytes=-500"), 100), ByteRange::Partial(0, 99));
        assert_eq!(parse_range(Some("bytes=50-500"), 100), ByteRange::Partial(50, 99));
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        assert_eq!(parse_range(Some("bytes=100-"), 100), ByteRange::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=200-300"), 100), ByteRange::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=-0"), 100), ByteRange::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=0-"), 0), ByteRange::Unsatisfiable);
    }

    #[test]
    fn test_parse_range_ignores_malformed() {
        assert_eq!(parse_range(Some("items=0-9"), 100), ByteRange::Full);
        assert_eq!(parse_range(Some("bytes=0-9,20-29"), 100), ByteRange::Full);
        assert_eq!(parse_range(Some("bytes=9-0"), 100), ByteRange::Full);
        assert_eq!(parse_range(Some("bytes=abc"), 100), ByteRange::Full);
    }

    #[test]
    fn test_audio_content_type() {
        assert_eq!(audio_content_type("audio/x.mp3"), "audio/mpeg");
        assert_eq!(audio_content_type("audio/x.flac"), "audio/flac");
        assert_eq!(audio_content_type("audio/x.bin"), "application/octet-stream");
    }
}
