//! # Pitch Detection Module
//!
//! Primary fundamental-frequency estimator: a YIN-family difference-function
//! detector working on a preprocessed block.
//!
//! ## Features
//! - Lag search restricted to the configured frequency band
//! - First-dip selection against a fixed CMND threshold to avoid octave errors
//! - Parabolic interpolation for sub-sample accuracy
//! - Confidence score derived from the depth of the selected dip

/// Output of one estimator for one frame.
///
/// A frequency of zero (or below) means "no pitch"; that is a normal result
/// for silence or unvoiced input, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionResult {
    pub frequency_hz: f32,
    /// In [0, 1].
    pub confidence: f32,
}

impl DetectionResult {
    pub fn new(frequency_hz: f32, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            frequency_hz,
            confidence,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_pitch(&self) -> bool {
        self.frequency_hz > 0.0
    }
}

/// Parameters of the primary estimator, a subset of [`crate::DetectorConfig`].
#[derive(Debug, Clone, Copy)]
pub struct YinParams {
    pub threshold: f32,
    pub min_freq: f32,
    pub max_freq: f32,
}

/// Estimates the fundamental frequency of a preprocessed block.
///
/// Lags run from `sample_rate / max_freq` to the lesser of half the block and
/// `sample_rate / min_freq`. The first lag whose cumulative-mean-normalized
/// difference drops below `threshold` is followed down to its local minimum,
/// refined with a parabola, and converted to Hz.
///
/// # Arguments
/// * `signal` - Preprocessed (zero-mean, windowed) samples
/// * `sample_rate` - Sample rate in Hz
/// * `params` - Threshold and frequency band
///
/// # Returns
/// * A [`DetectionResult`]; "no pitch" when nothing dips below the threshold,
///   the lag range is empty, or the refined frequency leaves the band.
pub fn detect_pitch_yin(signal: &[f32], sample_rate: u32, params: &YinParams) -> DetectionResult {
    let half = signal.len() / 2;
    let sr = sample_rate as f32;

    let min_tau = ((sr / params.max_freq).floor() as usize).max(1);
    let max_tau = half
        .saturating_sub(1)
        .min((sr / params.min_freq).floor() as usize);
    if max_tau <= min_tau {
        return DetectionResult::none();
    }

    // --- Squared difference over the first half of the block ---
    // `diff[tau - 1]` holds d(tau); lags below the band still feed the running mean.
    let diff: Vec<f32> = (1..=max_tau)
        .map(|tau| {
            signal[..half]
                .iter()
                .zip(&signal[tau..tau + half])
                .map(|(a, b)| {
                    let delta = a - b;
                    delta * delta
                })
                .sum::<f32>()
        })
        .collect();

    // --- Cumulative mean normalization ---
    // Index 0 of `cmnd` corresponds to lag `min_tau`.
    let mut cmnd = Vec::with_capacity(max_tau + 1 - min_tau);
    let mut running_sum = 0.0;
    for (tau, &d) in (1..=max_tau).zip(&diff) {
        running_sum += d;
        if tau < min_tau {
            continue;
        }
        cmnd.push(if tau == min_tau || running_sum <= 0.0 {
            1.0
        } else {
            d * tau as f32 / running_sum
        });
    }

    // --- First dip below threshold, then down to its local minimum ---
    let Some(mut best) = cmnd.iter().position(|&v| v < params.threshold) else {
        return DetectionResult::none();
    };
    while best + 1 < cmnd.len() && cmnd[best + 1] < cmnd[best] {
        best += 1;
    }

    // --- Parabolic interpolation over the neighbouring lags ---
    let refined_offset = if best > 0 && best + 1 < cmnd.len() {
        let (y1, y2, y3) = (cmnd[best - 1], cmnd[best], cmnd[best + 1]);
        let denominator = y1 - 2.0 * y2 + y3;
        if denominator != 0.0 {
            best as f32 + (y1 - y3) / (2.0 * denominator)
        } else {
            best as f32
        }
    } else {
        best as f32
    };

    let frequency = sr / (min_tau as f32 + refined_offset);
    if !frequency.is_finite() || frequency < params.min_freq || frequency > params.max_freq {
        return DetectionResult::none();
    }

    DetectionResult::new(frequency, 1.0 - cmnd[best])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::preprocess::preprocess;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44_100;

    fn params() -> YinParams {
        YinParams {
            threshold: 0.15,
            min_freq: 60.0,
            max_freq: 1200.0,
        }
    }

    fn sine(frequency: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    fn detect(signal: &[f32]) -> DetectionResult {
        let (processed, _) = preprocess(signal);
        detect_pitch_yin(&processed, SAMPLE_RATE, &params())
    }

    #[test]
    fn silence_has_no_pitch() {
        let result = detect(&[0.0; 2048]);
        assert!(!result.has_pitch());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn sine_waves_are_found_within_one_percent() {
        for &frequency in &[220.0, 261.63, 329.63, 440.0, 659.25] {
            let result = detect(&sine(frequency, 2048));
            let error = (result.frequency_hz - frequency).abs() / frequency;
            assert!(
                error < 0.01,
                "{frequency} Hz detected as {} Hz",
                result.frequency_hz
            );
            assert!(
                result.confidence >= 0.9,
                "{frequency} Hz confidence {}",
                result.confidence
            );
        }
    }

    #[test]
    fn confidence_stays_in_unit_range() {
        assert_eq!(DetectionResult::new(440.0, f32::NAN).confidence, 0.0);
        assert_eq!(DetectionResult::new(440.0, 1.7).confidence, 1.0);
        assert_eq!(DetectionResult::new(440.0, -0.2).confidence, 0.0);
    }

    /// Sweeps the preset's band at its block size: every reported pitch is
    /// the played one, within 1% away from the band edges.
    fn sweep_band(config: &DetectorConfig) {
        let params = YinParams {
            threshold: config.threshold,
            min_freq: config.min_freq,
            max_freq: config.max_freq,
        };
        let mut frequency = config.min_freq;
        while frequency <= config.max_freq {
            let (processed, _) = preprocess(&sine(frequency, config.block_size));
            let result = detect_pitch_yin(&processed, SAMPLE_RATE, &params);
            if result.has_pitch() {
                let interior =
                    frequency >= config.min_freq * 1.5 && frequency <= config.max_freq / 1.05;
                let tolerance = if interior { 0.01 } else { 0.03 };
                let error = (result.frequency_hz - frequency).abs() / frequency;
                assert!(
                    error < tolerance,
                    "{frequency} Hz detected as {} Hz (block {})",
                    result.frequency_hz,
                    config.block_size
                );
            }
            frequency *= 1.06;
        }
    }

    #[test]
    fn tuner_band_has_no_octave_errors() {
        sweep_band(&DetectorConfig::tuner());
    }

    #[test]
    fn ukulele_band_has_no_octave_errors() {
        sweep_band(&DetectorConfig::for_instrument(
            &crate::matching::Instrument::ukulele(),
            12,
        ));
    }

    #[test]
    fn high_notes_keep_their_octave() {
        for &frequency in &[1046.5, 1079.44, 1100.0, 1143.67] {
            let result = detect(&sine(frequency, 2048));
            let error = (result.frequency_hz - frequency).abs() / frequency;
            assert!(
                error < 0.01,
                "{frequency} Hz detected as {} Hz",
                result.frequency_hz
            );
            assert!(result.confidence >= 0.9, "{result:?}");
        }
    }

    #[test]
    fn low_pitch_needs_a_longer_block() {
        let result = detect(&sine(110.0, 4096));
        assert!((result.frequency_hz - 110.0).abs() < 1.1, "{result:?}");
    }

    #[test]
    fn harmonics_do_not_cause_octave_errors() {
        let signal: Vec<f32> = (0..2048)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.4 * (2.0 * PI * 220.0 * t).sin()
                    + 0.3 * (2.0 * PI * 440.0 * t).sin()
                    + 0.2 * (2.0 * PI * 660.0 * t).sin()
            })
            .collect();
        let result = detect(&signal);
        assert!((result.frequency_hz - 220.0).abs() < 2.2, "{result:?}");
    }

    #[test]
    fn never_reports_outside_band() {
        let narrow = YinParams {
            threshold: 0.15,
            min_freq: 60.0,
            max_freq: 300.0,
        };
        let (processed, _) = preprocess(&sine(1000.0, 2048));
        let result = detect_pitch_yin(&processed, SAMPLE_RATE, &narrow);
        assert!(
            !result.has_pitch() || (result.frequency_hz - 1000.0).abs() > 50.0,
            "{result:?}"
        );
        assert!(result.frequency_hz <= 300.0);
    }

    #[test]
    fn empty_lag_range_yields_no_pitch() {
        let (processed, _) = preprocess(&sine(440.0, 64));
        let result = detect_pitch_yin(&processed, SAMPLE_RATE, &params());
        assert!(!result.has_pitch());
    }

    #[test]
    fn white_noise_is_not_confident() {
        // Deterministic LCG noise keeps the test repeatable.
        let mut state = 0x2545_f491_u32;
        let noise: Vec<f32> = (0..2048)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect();
        let result = detect(&noise);
        assert!(!result.has_pitch() || result.confidence < 0.9, "{result:?}");
    }
}
