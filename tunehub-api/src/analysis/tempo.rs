//! Tempo estimation from an onset strength envelope
//!
//! Autocorrelates the mean-removed envelope over lags covering 30-300 BPM and
//! weights each lag with a log-normal prior centred on 120 BPM (one octave
//! standard deviation), which keeps half/double-time candidates from winning
//! on ties. The winning lag is refined with parabolic interpolation.

const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;
const PRIOR_BPM: f32 = 120.0;
const PRIOR_OCTAVES: f32 = 1.0;

const EPSILON: f32 = 1e-9;

fn tempo_prior(bpm: f32) -> f32 {
    let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Estimate tempo in BPM; returns 0.0 when no periodicity is found
pub fn estimate_tempo(onset_envelope: &[f32], frame_rate: f32) -> f32 {
    let len = onset_envelope.len();
    if len < 4 || frame_rate <= 0.0 {
        return 0.0;
    }

    let mean = onset_envelope.iter().sum::<f32>() / len as f32;
    let centered: Vec<f32> = onset_envelope.iter().map(|v| v - mean).collect();
    let energy: f32 = centered.iter().map(|v| v * v).sum();
    if energy <= EPSILON {
        return 0.0;
    }

    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).ceil() as usize).min(len - 2);
    if min_lag >= max_lag {
        return 0.0;
    }

    // Biased autocorrelation, normalised by zero-lag energy
    let autocorrelation: Vec<f32> = (0..=max_lag + 1)
        .map(|lag| {
            if lag >= len {
                return 0.0;
            }
            centered[..len - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f32>()
                / energy
        })
        .collect();

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let value = autocorrelation[lag];
        if value <= 0.0 {
            continue;
        }
        let bpm = 60.0 * frame_rate / lag as f32;
        let score = value * tempo_prior(bpm);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let Some((lag, _)) = best else {
        return 0.0;
    };

    let refined_lag = refine_peak(&autocorrelation, lag);
    60.0 * frame_rate / refined_lag
}

/// Parabolic interpolation of a local maximum
fn refine_peak(values: &[f32], idx: usize) -> f32 {
    if idx == 0 || idx + 1 >= values.len() {
        return idx as f32;
    }
    let (left, center, right) = (values[idx - 1], values[idx], values[idx + 1]);
    let denominator = left - 2.0 * center + right;
    if denominator >= 0.0 {
        return idx as f32;
    }
    let delta = (0.5 * (left - right) / denominator).clamp(-0.5, 0.5);
    idx as f32 + delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_envelope(period_frames: usize, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| if i % period_frames == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_periodic_pulses() {
        // 43.07 frames/s (22050 Hz, hop 512), pulse every 22 frames = 117.4 BPM
        let frame_rate = 22050.0 / 512.0;
        let envelope = pulse_envelope(22, 1000);
        let tempo = estimate_tempo(&envelope, frame_rate);

        assert!((tempo - 117.4).abs() < 3.0, "tempo {}", tempo);
    }

    #[test]
    fn test_prior_prefers_moderate_tempo_over_half_time() {
        assert!(tempo_prior(120.0) > tempo_prior(60.0));
        assert!(tempo_prior(120.0) > tempo_prior(240.0));
        assert!((tempo_prior(120.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_envelope_has_no_tempo() {
        assert_eq!(estimate_tempo(&vec![0.5; 500], 43.0), 0.0);
        assert_eq!(estimate_tempo(&[], 43.0), 0.0);
    }

    #[test]
    fn test_refine_peak_moves_toward_larger_neighbour() {
        let values = [0.0, 0.5, 1.0, 0.9, 0.0];
        let refined = refine_peak(&values, 2);
        assert!(refined > 2.0 && refined < 2.5);
    }
}
