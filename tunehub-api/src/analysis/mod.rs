//! Acoustic feature analysis
//!
//! Pure functions of a mono waveform and its sample rate. [`analyze_file`]
//! decodes first and is what the background analyzer calls; [`analyze_samples`]
//! is the part worth testing directly.

pub mod key;
pub mod rules;
pub mod spectral;
pub mod tempo;

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::utils::audio_decoder::decode_audio_file;
use key::detect_key;
use rules::{GenreInputs, MoodInputs};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("No audio samples to analyze")]
    EmptyAudio,

    #[error("Non-finite {0} computed")]
    NonFinite(&'static str),
}

/// Features written to the track record after a successful analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFeatures {
    pub tempo: f64,
    pub musical_key: String,
    pub genre: String,
    pub mood: String,
    pub energy: f64,
    pub danceability: f64,
}

/// Features plus the decoded length, used to backfill a missing duration
#[derive(Debug, Clone)]
pub struct AnalyzedTrack {
    pub features: AudioFeatures,
    pub duration_seconds: f64,
}

fn finite(value: f64, what: &'static str) -> Result<f64, AnalysisError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalysisError::NonFinite(what))
    }
}

pub fn analyze_samples(samples: &[f32], sample_rate: u32) -> Result<AudioFeatures, AnalysisError> {
    if samples.is_empty() || sample_rate == 0 {
        return Err(AnalysisError::EmptyAudio);
    }

    let summary = spectral::summarize(samples, sample_rate);

    let tempo = finite(
        tempo::estimate_tempo(&summary.onset_envelope, summary.frame_rate) as f64,
        "tempo",
    )?;
    let rms = finite(summary.rms as f64, "energy")?;
    let centroid_hz = finite(summary.centroid_hz as f64, "spectral centroid")?;
    if summary.chroma.iter().any(|c| !c.is_finite()) {
        return Err(AnalysisError::NonFinite("chroma"));
    }

    let key = detect_key(&summary.chroma);
    let energy = rules::normalize_energy(rms);

    let genre = rules::genre(&GenreInputs {
        tempo,
        energy,
        centroid_hz,
    });
    let mood = rules::mood(&MoodInputs {
        energy,
        tempo,
        mode: key.mode,
    });

    Ok(AudioFeatures {
        tempo,
        musical_key: key.to_string(),
        genre: genre.to_string(),
        mood: mood.to_string(),
        energy,
        danceability: rules::danceability(tempo, energy),
    })
}

/// Decode `path` and analyze the result
pub fn analyze_file(path: &Path) -> Result<AnalyzedTrack, AnalysisError> {
    let decoded =
        decode_audio_file(path).map_err(|e| AnalysisError::Decode(format!("{:#}", e)))?;

    let features = analyze_samples(&decoded.samples, decoded.sample_rate)?;

    tracing::debug!(
        path = %path.display(),
        tempo = features.tempo,
        key = %features.musical_key,
        genre = %features.genre,
        mood = %features.mood,
        "Audio features computed"
    );

    Ok(AnalyzedTrack {
        features,
        duration_seconds: decoded.duration_seconds,
    })
}
