//! Deferred acoustic analysis of stored tracks
//!
//! Decoding and feature computation run on the [`WorkerPool`]; the catalog
//! update happens back on the async side. Every failure is logged here and
//! reported through [`AnalysisOutcome`]; nothing propagates to the caller.

use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use super::worker_pool::{JobOutcome, WorkerPool};
use crate::analysis::{analyze_file, AnalysisError, AnalyzedTrack, AudioFeatures};
use crate::db::tracks;
use crate::storage::ContentStore;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Features were written to the catalog
    Updated(AudioFeatures),
    /// Analysis finished but the track row is gone
    TrackMissing,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct AnalysisService {
    workers: WorkerPool,
    db: SqlitePool,
    store: ContentStore,
}

impl AnalysisService {
    pub fn new(workers: WorkerPool, db: SqlitePool, store: ContentStore) -> Self {
        Self { workers, db, store }
    }

    /// Queue analysis of a stored track
    ///
    /// Handlers drop the returned handle; it exists so callers (and tests) can
    /// wait for the result when they need to.
    pub fn dispatch(&self, track_id: i64, audio_path: &str) -> JoinHandle<AnalysisOutcome> {
        let store = self.store.clone();
        let relative_path = audio_path.to_string();

        tracing::info!(track_id, path = %relative_path, "Queued audio analysis");

        let job = self
            .workers
            .submit(format!("analysis:{}", track_id), move || -> Result<AnalyzedTrack, AnalysisError> {
                let path = store
                    .resolve(&relative_path)
                    .map_err(|e| AnalysisError::Decode(e.to_string()))?;
                analyze_file(&path)
            });

        let db = self.db.clone();
        tokio::spawn(async move {
            let outcome = job
                .await
                .unwrap_or_else(|e| JobOutcome::Failed(e.to_string()));

            match outcome {
                JobOutcome::Completed(Ok(analyzed)) => {
                    match tracks::update_analysis(
                        &db,
                        track_id,
                        &analyzed.features,
                        Some(analyzed.duration_seconds),
                    )
                    .await
                    {
                        Ok(true) => {
                            tracing::info!(
                                track_id,
                                tempo = analyzed.features.tempo,
                                key = %analyzed.features.musical_key,
                                genre = %analyzed.features.genre,
                                mood = %analyzed.features.mood,
                                "Audio analysis stored"
                            );
                            AnalysisOutcome::Updated(analyzed.features)
                        }
                        Ok(false) => {
                            tracing::warn!(track_id, "Track removed before analysis finished");
                            AnalysisOutcome::TrackMissing
                        }
                        Err(e) => {
                            tracing::error!(track_id, error = %e, "Failed to store analysis");
                            AnalysisOutcome::Failed(e.to_string())
                        }
                    }
                }
                JobOutcome::Completed(Err(e)) => {
                    tracing::error!(track_id, error = %e, "Audio analysis failed");
                    AnalysisOutcome::Failed(e.to_string())
                }
                JobOutcome::Failed(reason) => {
                    tracing::error!(track_id, error = %reason, "Audio analysis job failed");
                    AnalysisOutcome::Failed(reason)
                }
                JobOutcome::TimedOut => {
                    tracing::warn!(track_id, "Audio analysis timed out");
                    AnalysisOutcome::TimedOut
                }
            }
        })
    }
}
