//! Single-pass STFT summary
//!
//! Walks the waveform once with a Hann-windowed 2048-point FFT (hop 512) and
//! accumulates everything the feature rules need, so no spectrogram is kept
//! in memory:
//! - mean frame RMS
//! - mean spectral centroid (Hz)
//! - mean max-normalised chroma (12 pitch classes, index 0 = C)
//! - onset strength envelope (half-wave rectified log-magnitude flux)

use apodize::hanning_iter;
use rustfft::{num_complex::Complex, FftPlanner};

pub const FRAME_SIZE: usize = 2048;
pub const HOP_SIZE: usize = 512;

/// Chroma ignores bins outside this band (A0 up to roughly the 5th harmonic of C8)
const CHROMA_MIN_HZ: f32 = 27.5;
const CHROMA_MAX_HZ: f32 = 5000.0;

/// Log compression factor for the onset envelope
const FLUX_COMPRESSION: f32 = 1000.0;

const EPSILON: f32 = 1e-10;

/// Per-track spectral statistics
#[derive(Debug, Clone)]
pub struct SpectralSummary {
    /// Mean chroma, max-normalised per frame before averaging
    pub chroma: [f32; 12],
    /// Mean spectral centroid in Hz (silent frames count as 0)
    pub centroid_hz: f32,
    /// Mean frame RMS amplitude
    pub rms: f32,
    /// One onset strength value per frame
    pub onset_envelope: Vec<f32>,
    /// Frames per second (sample_rate / hop)
    pub frame_rate: f32,
}

/// Map a frequency to its pitch class (0 = C), or None outside the chroma band
pub fn pitch_class(frequency_hz: f32) -> Option<usize> {
    if !(CHROMA_MIN_HZ..=CHROMA_MAX_HZ).contains(&frequency_hz) {
        return None;
    }
    let midi = 69.0 + 12.0 * (frequency_hz / 440.0).log2();
    Some((midi.round() as i64).rem_euclid(12) as usize)
}

/// Number of frames for a signal of `len` samples
///
/// At least one frame. When the hops do not land exactly on the end, one
/// zero-padded tail frame covers the remaining samples.
pub fn frame_count(len: usize) -> usize {
    1 + len.saturating_sub(FRAME_SIZE).div_ceil(HOP_SIZE)
}

pub fn summarize(samples: &[f32], sample_rate: u32) -> SpectralSummary {
    let frames = frame_count(samples.len());
    let bins = FRAME_SIZE / 2 + 1;
    let bin_hz = sample_rate as f32 / FRAME_SIZE as f32;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let window: Vec<f32> = hanning_iter(FRAME_SIZE).map(|w| w as f32).collect();
    let mut buffer = vec![Complex::new(0.0f32, 0.0); FRAME_SIZE];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];

    let bin_pitch: Vec<Option<usize>> = (0..bins)
        .map(|b| pitch_class(b as f32 * bin_hz))
        .collect();

    let mut magnitudes = vec![0.0f32; bins];
    let mut previous_log = vec![0.0f32; bins];
    let mut chroma_sum = [0.0f64; 12];
    let mut centroid_sum = 0.0f64;
    let mut rms_sum = 0.0f64;
    let mut onset_envelope = Vec::with_capacity(frames);

    for frame_idx in 0..frames {
        let start = frame_idx * HOP_SIZE;
        let end = (start + FRAME_SIZE).min(samples.len());
        let frame = &samples[start.min(end)..end];

        let sum_squares: f32 = frame.iter().map(|s| s * s).sum();
        rms_sum += (sum_squares / FRAME_SIZE as f32).sqrt() as f64;

        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = frame.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);

        for (magnitude, value) in magnitudes.iter_mut().zip(buffer.iter()) {
            *magnitude = value.norm();
        }

        let total: f32 = magnitudes.iter().sum();
        if total > EPSILON {
            let weighted: f32 = magnitudes
                .iter()
                .enumerate()
                .map(|(b, m)| b as f32 * bin_hz * m)
                .sum();
            centroid_sum += (weighted / total) as f64;
        }

        let mut frame_chroma = [0.0f32; 12];
        for (magnitude, pitch) in magnitudes.iter().zip(bin_pitch.iter()) {
            if let Some(pc) = pitch {
                frame_chroma[*pc] += magnitude * magnitude;
            }
        }
        let peak = frame_chroma.iter().copied().fold(0.0f32, f32::max);
        if peak > EPSILON {
            for (acc, value) in chroma_sum.iter_mut().zip(frame_chroma.iter()) {
                *acc += (value / peak) as f64;
            }
        }

        let mut flux = 0.0f32;
        for (magnitude, previous) in magnitudes.iter().zip(previous_log.iter_mut()) {
            let log_magnitude = (1.0 + FLUX_COMPRESSION * magnitude).ln();
            if frame_idx > 0 {
                flux += (log_magnitude - *previous).max(0.0);
            }
            *previous = log_magnitude;
        }
        onset_envelope.push(flux);
    }

    let n = frames as f64;
    let mut chroma = [0.0f32; 12];
    for (mean, sum) in chroma.iter_mut().zip(chroma_sum.iter()) {
        *mean = (sum / n) as f32;
    }

    SpectralSummary {
        chroma,
        centroid_hz: (centroid_sum / n) as f32,
        rms: (rms_sum / n) as f32,
        onset_envelope,
        frame_rate: sample_rate as f32 / HOP_SIZE as f32,
    }
}
