//! Rule-based genre and mood labels, energy scaling and danceability
//!
//! Genre and mood are ordered `(label, predicate)` tables evaluated top to
//! bottom; the first matching rule wins and a fixed fallback covers the rest.
//! These are coarse heuristics over three or four numbers, not a classifier.

use super::key::Mode;

/// Mean RMS is scaled by this factor before clamping to [0, 1]
pub const ENERGY_SCALE: f64 = 10.0;

/// Tempo (BPM) scoring 1.0 for danceability
pub const DANCE_TEMPO_BPM: f64 = 125.0;

pub struct Rule<I> {
    pub label: &'static str,
    pub when: fn(&I) -> bool,
}

/// Evaluate rules in order, returning the first matching label
pub fn classify<I>(rules: &[Rule<I>], input: &I, fallback: &'static str) -> &'static str {
    rules
        .iter()
        .find(|rule| (rule.when)(input))
        .map(|rule| rule.label)
        .unwrap_or(fallback)
}

#[derive(Debug, Clone, Copy)]
pub struct GenreInputs {
    pub tempo: f64,
    pub energy: f64,
    pub centroid_hz: f64,
}

pub const GENRE_FALLBACK: &str = "Pop";

pub const GENRE_RULES: &[Rule<GenreInputs>] = &[
    Rule {
        label: "Electronic",
        when: |g| g.tempo > 140.0 && g.energy > 0.7 && g.centroid_hz > 3000.0,
    },
    Rule {
        label: "Rock",
        when: |g| g.tempo > 140.0 && g.energy > 0.7,
    },
    Rule {
        label: "Pop",
        when: |g| g.tempo > 120.0 && g.energy > 0.5 && g.centroid_hz > 2000.0,
    },
    Rule {
        label: "Hip-Hop",
        when: |g| g.tempo > 120.0 && g.energy > 0.5,
    },
    Rule {
        label: "Ballad",
        when: |g| g.tempo < 80.0,
    },
    Rule {
        label: "Ambient",
        when: |g| (80.0..=120.0).contains(&g.tempo) && g.energy < 0.3,
    },
    Rule {
        label: "Folk",
        when: |g| (80.0..=120.0).contains(&g.tempo),
    },
];

#[derive(Debug, Clone, Copy)]
pub struct MoodInputs {
    pub energy: f64,
    pub tempo: f64,
    pub mode: Mode,
}

pub const MOOD_FALLBACK: &str = "Peaceful";

pub const MOOD_RULES: &[Rule<MoodInputs>] = &[
    Rule {
        label: "Energetic",
        when: |m| m.energy > 0.7 && m.tempo > 120.0,
    },
    Rule {
        label: "Happy",
        when: |m| m.energy > 0.5 && m.tempo > 120.0 && m.mode == Mode::Major,
    },
    Rule {
        label: "Intense",
        when: |m| m.energy > 0.5 && m.tempo > 120.0 && m.mode == Mode::Minor,
    },
    Rule {
        label: "Calm",
        when: |m| m.energy < 0.3,
    },
    Rule {
        label: "Melancholic",
        when: |m| m.mode == Mode::Minor,
    },
];

pub fn genre(inputs: &GenreInputs) -> &'static str {
    classify(GENRE_RULES, inputs, GENRE_FALLBACK)
}

pub fn mood(inputs: &MoodInputs) -> &'static str {
    classify(MOOD_RULES, inputs, MOOD_FALLBACK)
}

/// Scale mean RMS into [0, 1]
pub fn normalize_energy(mean_rms: f64) -> f64 {
    (mean_rms * ENERGY_SCALE).clamp(0.0, 1.0)
}

/// 60% tempo proximity to 125 BPM, 40% energy, clamped to [0, 1]
pub fn danceability(tempo: f64, energy: f64) -> f64 {
    let tempo_score = (1.0 - (tempo - DANCE_TEMPO_BPM).abs() / DANCE_TEMPO_BPM).max(0.0);
    (tempo_score * 0.6 + energy * 0.4).clamp(0.0, 1.0)
}
