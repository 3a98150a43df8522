//! Upload intake: validate, store, extract, record
//!
//! Validation happens entirely before the first write. Once a blob is on disk
//! every later failure removes what this intake wrote, so a rejected upload
//! never leaves a catalog row or an orphaned file behind.

use axum::body::Bytes;
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;

use super::artwork::normalize_artwork;
use super::metadata_extractor::{ExtractedMetadata, MetadataExtractor};
use crate::db::tracks::{self, NewTrack, Track};
use crate::storage::{BlobKind, ContentStore, StoredBlob};
use tunehub_common::config::UploadConfig;

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "m4a", "ogg", "oga", "opus", "mp4", "aac", "aiff", "aif", "wma",
];

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_TITLE: &str = "Untitled";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Audio file must have a filename")]
    MissingFilename,

    #[error("Unsupported audio format: {0}")]
    UnsupportedAudioFormat(String),

    #[error("Audio file is {size} bytes, limit is {limit}")]
    AudioTooLarge { size: u64, limit: u64 },

    #[error("Artwork must have a filename")]
    MissingArtworkFilename,

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Artwork is {size} bytes, limit is {limit}")]
    ArtworkTooLarge { size: u64, limit: u64 },

    #[error("Artwork could not be decoded: {0}")]
    InvalidImage(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// One file part of an upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub audio: UploadedFile,
    pub artwork: Option<UploadedFile>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub uploaded_by: i64,
}

/// Lowercased extension if it is in `allowed`
fn allowed_extension(filename: &str, allowed: &[&str]) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}

fn present(filename: &Option<String>) -> Option<&str> {
    filename.as_deref().map(str::trim).filter(|f| !f.is_empty())
}

/// Blank overrides count as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn filename_stem(filename: &str) -> Option<String> {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validated audio part, ready to write
struct AcceptedAudio {
    filename: String,
    extension: String,
}

#[derive(Debug, Clone)]
pub struct UploadIntake {
    db: SqlitePool,
    store: ContentStore,
    extractor: MetadataExtractor,
    limits: UploadConfig,
}

impl UploadIntake {
    pub fn new(db: SqlitePool, store: ContentStore, limits: UploadConfig) -> Self {
        Self {
            db,
            store,
            extractor: MetadataExtractor::new(),
            limits,
        }
    }

    fn validate_audio(&self, audio: &UploadedFile) -> Result<AcceptedAudio, IntakeError> {
        let filename = present(&audio.filename).ok_or(IntakeError::MissingFilename)?;
        let extension = allowed_extension(filename, AUDIO_EXTENSIONS)
            .ok_or_else(|| IntakeError::UnsupportedAudioFormat(filename.to_string()))?;

        let size = audio.bytes.len() as u64;
        if size > self.limits.max_audio_bytes {
            return Err(IntakeError::AudioTooLarge {
                size,
                limit: self.limits.max_audio_bytes,
            });
        }

        Ok(AcceptedAudio {
            filename: filename.to_string(),
            extension,
        })
    }

    fn validate_artwork(&self, artwork: &UploadedFile) -> Result<(), IntakeError> {
        let filename = present(&artwork.filename).ok_or(IntakeError::MissingArtworkFilename)?;
        allowed_extension(filename, IMAGE_EXTENSIONS)
            .ok_or_else(|| IntakeError::UnsupportedImageFormat(filename.to_string()))?;

        let size = artwork.bytes.len() as u64;
        if size > self.limits.max_artwork_bytes {
            return Err(IntakeError::ArtworkTooLarge {
                size,
                limit: self.limits.max_artwork_bytes,
            });
        }
        Ok(())
    }

    /// Validate and persist an upload, returning the new catalog record
    ///
    /// Everything after validation runs on a detached task, so dropping the
    /// returned future (a client disconnect) never interrupts it between a
    /// blob write and either its catalog insert or its cleanup.
    pub async fn ingest(&self, request: UploadRequest) -> Result<Track, IntakeError> {
        let audio = self.validate_audio(&request.audio)?;
        if let Some(artwork) = &request.artwork {
            self.validate_artwork(artwork)?;
        }

        let intake = self.clone();
        tokio::spawn(async move { intake.persist(request, audio).await })
            .await
            .map_err(|e| IntakeError::Internal(format!("upload task failed: {}", e)))?
    }

    async fn persist(
        &self,
        request: UploadRequest,
        audio: AcceptedAudio,
    ) -> Result<Track, IntakeError> {
        let mut written: Vec<StoredBlob> = Vec::new();
        match self.store_and_record(request, &audio, &mut written).await {
            Ok(track) => {
                tracing::info!(
                    track_id = track.id,
                    title = %track.title,
                    uploaded_by = track.uploaded_by,
                    path = %track.audio_path,
                    "Track uploaded"
                );
                Ok(track)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Upload failed, removing stored blobs");
                self.discard(&written).await;
                Err(e)
            }
        }
    }

    async fn store_and_record(
        &self,
        request: UploadRequest,
        audio: &AcceptedAudio,
        written: &mut Vec<StoredBlob>,
    ) -> Result<Track, IntakeError> {
        let audio_blob = self
            .store
            .write(BlobKind::Audio, &audio.extension, &request.audio.bytes)
            .await?;
        written.push(audio_blob.clone());

        let artwork_path = match request.artwork {
            Some(artwork) => {
                let jpeg = tokio::task::spawn_blocking(move || normalize_artwork(&artwork.bytes))
                    .await
                    .map_err(|e| IntakeError::Internal(format!("artwork task failed: {}", e)))?
                    .map_err(|e| IntakeError::InvalidImage(e.to_string()))?;

                let blob = self.store.write(BlobKind::Artwork, "jpg", &jpeg).await?;
                let path = blob.relative_path.clone();
                written.push(blob);
                Some(path)
            }
            None => None,
        };

        let extracted = self.extract(&audio_blob).await;

        let new_track = NewTrack {
            title: non_blank(request.title)
                .or(extracted.title)
                .or_else(|| filename_stem(&audio.filename))
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: non_blank(request.artist)
                .or(extracted.artist)
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: non_blank(request.album)
                .or(extracted.album)
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            duration: extracted.duration_seconds,
            bitrate_kbps: extracted.bitrate_kbps.map(i64::from),
            sample_rate: extracted.sample_rate.map(i64::from),
            tagged_genre: extracted.genre,
            audio_path: audio_blob.relative_path,
            artwork_path,
            uploaded_by: request.uploaded_by,
        };

        Ok(tracks::create_track(&self.db, &new_track).await?)
    }

    /// Read embedded tags off the stored blob; empty on any failure
    async fn extract(&self, blob: &StoredBlob) -> ExtractedMetadata {
        let extractor = self.extractor;
        let path = blob.absolute_path.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Metadata extraction task failed");
                ExtractedMetadata::default()
            })
    }

    async fn discard(&self, blobs: &[StoredBlob]) {
        for blob in blobs {
            if let Err(e) = self.store.delete(&blob.relative_path).await {
                tracing::error!(
                    path = %blob.relative_path,
                    error = %e,
                    "Failed to remove blob after rejected upload"
                );
            }
        }
    }
}
