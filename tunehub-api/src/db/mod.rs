//! Database access for tunehub-api
//!
//! SQLite catalog holding one row per uploaded track.

pub mod tracks;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool and create tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url)
        .await
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create catalog tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album TEXT NOT NULL,
            duration REAL,
            bitrate_kbps INTEGER,
            sample_rate INTEGER,
            tagged_genre TEXT,
            audio_path TEXT NOT NULL,
            artwork_path TEXT,
            tempo REAL,
            musical_key TEXT,
            genre TEXT,
            mood TEXT,
            energy REAL,
            danceability REAL,
            analyzed_at TEXT,
            uploaded_by INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_title ON tracks(title)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks(artist)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_uploaded_by ON tracks(uploaded_by)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (tracks)");

    Ok(())
}
