//! Key estimation from mean chroma

use serde::Serialize;
use std::fmt;

pub const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Major,
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => write!(f, "Major"),
            Mode::Minor => write!(f, "Minor"),
        }
    }
}

/// Tonic pitch class (0 = C) plus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicalKey {
    pub tonic: usize,
    pub mode: Mode,
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", PITCH_NAMES[self.tonic % 12], self.mode)
    }
}

/// Dominant pitch class is the tonic; the mode comes from comparing the major
/// third (+4 semitones) against the minor third (+3). Major wins ties.
pub fn detect_key(chroma: &[f32; 12]) -> MusicalKey {
    // first maximum wins, so an all-zero chroma reads as C
    let tonic = chroma
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v > chroma[best] { i } else { best });

    let major_third = chroma[(tonic + 4) % 12];
    let minor_third = chroma[(tonic + 3) % 12];
    let mode = if major_third >= minor_third {
        Mode::Major
    } else {
        Mode::Minor
    };

    MusicalKey { tonic, mode }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_triad() {
        let mut chroma = [0.0; 12];
        chroma[0] = 1.0; // C
        chroma[4] = 0.6; // E
        chroma[7] = 0.6; // G
        let key = detect_key(&chroma);
        assert_eq!(key, MusicalKey { tonic: 0, mode: Mode::Major });
        assert_eq!(key.to_string(), "C Major");
    }

    #[test]
    fn test_c_sharp_minor() {
        let mut chroma = [0.1; 12];
        chroma[1] = 1.0; // C#
        chroma[4] = 0.7; // E (minor third above C#)
        chroma[5] = 0.2; // F (major third above C#)
        assert_eq!(detect_key(&chroma).to_string(), "C# Minor");
    }

    #[test]
    fn test_major_wins_ties() {
        let mut chroma = [0.0; 12];
        chroma[9] = 1.0; // A
        chroma[0] = 0.4; // C (minor third)
        chroma[1] = 0.4; // C# (major third)
        assert_eq!(detect_key(&chroma).to_string(), "A Major");
    }

    #[test]
    fn test_tonic_wraps_around_octave() {
        let mut chroma = [0.0; 12];
        chroma[11] = 1.0; // B
        chroma[2] = 0.5; // D (minor third, wraps)
        assert_eq!(detect_key(&chroma).to_string(), "B Minor");
    }
}
