//! Track catalog operations

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::analysis::AudioFeatures;

/// Analysis columns; all `None` until the analyzer has run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisFields {
    pub tempo: Option<f64>,
    pub musical_key: Option<String>,
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl AnalysisFields {
    pub fn is_pending(&self) -> bool {
        self.analyzed_at.is_none()
    }
}

/// Catalog record for one uploaded audio item
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Option<f64>,
    pub bitrate_kbps: Option<i64>,
    pub sample_rate: Option<i64>,
    pub tagged_genre: Option<String>,
    pub audio_path: String,
    pub artwork_path: Option<String>,
    #[serde(flatten)]
    pub analysis: AnalysisFields,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by intake when creating a record
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Option<f64>,
    pub bitrate_kbps: Option<i64>,
    pub sample_rate: Option<i64>,
    pub tagged_genre: Option<String>,
    pub audio_path: String,
    pub artwork_path: Option<String>,
    pub uploaded_by: i64,
}

const TRACK_COLUMNS: &str = r#"
    id, title, artist, album, duration, bitrate_kbps, sample_rate, tagged_genre,
    audio_path, artwork_path, tempo, musical_key, genre, mood, energy, danceability,
    analyzed_at, uploaded_by, created_at
"#;

fn track_from_row(row: &SqliteRow) -> sqlx::Result<Track> {
    Ok(Track {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        duration: row.try_get("duration")?,
        bitrate_kbps: row.try_get("bitrate_kbps")?,
        sample_rate: row.try_get("sample_rate")?,
        tagged_genre: row.try_get("tagged_genre")?,
        audio_path: row.try_get("audio_path")?,
        artwork_path: row.try_get("artwork_path")?,
        analysis: AnalysisFields {
            tempo: row.try_get("tempo")?,
            musical_key: row.try_get("musical_key")?,
            genre: row.try_get("genre")?,
            mood: row.try_get("mood")?,
            energy: row.try_get("energy")?,
            danceability: row.try_get("danceability")?,
            analyzed_at: row.try_get("analyzed_at")?,
        },
        uploaded_by: row.try_get("uploaded_by")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a new track; analysis fields start out null
pub async fn create_track(pool: &SqlitePool, track: &NewTrack) -> sqlx::Result<Track> {
    let created_at = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO tracks (
            title, artist, album, duration, bitrate_kbps, sample_rate, tagged_genre,
            audio_path, artwork_path, uploaded_by, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&track.title)
    .bind(&track.artist)
    .bind(&track.album)
    .bind(track.duration)
    .bind(track.bitrate_kbps)
    .bind(track.sample_rate)
    .bind(&track.tagged_genre)
    .bind(&track.audio_path)
    .bind(&track.artwork_path)
    .bind(track.uploaded_by)
    .bind(created_at)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Track {
        id,
        title: track.title.clone(),
        artist: track.artist.clone(),
        album: track.album.clone(),
        duration: track.duration,
        bitrate_kbps: track.bitrate_kbps,
        sample_rate: track.sample_rate,
        tagged_genre: track.tagged_genre.clone(),
        audio_path: track.audio_path.clone(),
        artwork_path: track.artwork_path.clone(),
        analysis: AnalysisFields::default(),
        uploaded_by: track.uploaded_by,
        created_at,
    })
}

pub async fn get_track(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Track>> {
    let row = sqlx::query(&format!("SELECT {} FROM tracks WHERE id = ?", TRACK_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(track_from_row).transpose()
}

/// All tracks, newest first
pub async fn list_tracks(pool: &SqlitePool) -> sqlx::Result<Vec<Track>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tracks ORDER BY created_at DESC, id DESC",
        TRACK_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(track_from_row).collect()
}

/// Write a complete analysis result in a single statement
///
/// `decoded_duration` only fills `duration` when it is still null.
/// Returns false when the track no longer exists.
pub async fn update_analysis(
    pool: &SqlitePool,
    id: i64,
    features: &AudioFeatures,
    decoded_duration: Option<f64>,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tracks SET
            tempo = ?,
            musical_key = ?,
            genre = ?,
            mood = ?,
            energy = ?,
            danceability = ?,
            duration = COALESCE(duration, ?),
            analyzed_at = ?
        WHERE id = ?
        "#,
    )
    .bind(features.tempo)
    .bind(&features.musical_key)
    .bind(&features.genre)
    .bind(&features.mood)
    .bind(features.energy)
    .bind(features.danceability)
    .bind(decoded_duration)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
