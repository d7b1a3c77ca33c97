//! # Spectral Fallback Estimator
//!
//! Reports whichever in-band frequency currently carries the most energy.
//! The primary estimator gives up on strummed chords (no single clear
//! period); this one still points in roughly the right direction.

use crate::fft::Spectrum;

/// Finds the dominant in-band peak of a spectrum with sub-bin precision.
///
/// Interpolation always runs on linear magnitudes, so decibel spectra are
/// converted first.
///
/// # Arguments
/// * `spectrum` - Half-spectrum of the current block
/// * `sample_rate` - Sample rate in Hz
/// * `min_freq`, `max_freq` - Frequency band in Hz
/// * `noise_floor` - Linear magnitude a peak must reach
///
/// # Returns
/// * `Some(frequency)` - Interpolated peak frequency, inside the band
/// * `None` - Empty band, peak below the noise floor, or result outside the band
pub fn dominant_frequency(
    spectrum: &Spectrum,
    sample_rate: u32,
    min_freq: f32,
    max_freq: f32,
    noise_floor: f32,
) -> Option<f32> {
    let bins = spectrum.bin_count();
    if bins < 3 {
        return None;
    }
    let resolution = spectrum.bin_resolution(sample_rate);

    let start_bin = ((min_freq / resolution).ceil() as usize).max(1);
    let end_bin = ((max_freq / resolution).floor() as usize).min(bins - 1);
    if start_bin > end_bin {
        return None;
    }

    let (peak_bin, peak) = (start_bin..=end_bin)
        .map(|k| (k, spectrum.linear_at(k)))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    if peak.is_nan() || peak < noise_floor || peak <= 0.0 {
        return None;
    }

    let mut position = peak_bin as f32;
    if peak_bin + 1 < bins {
        let y1 = spectrum.linear_at(peak_bin - 1);
        let y3 = spectrum.linear_at(peak_bin + 1);
        let denominator = y1 - 2.0 * peak + y3;
        if denominator.abs() > f32::EPSILON {
            let shift = 0.5 * (y1 - y3) / denominator;
            if shift.is_finite() && shift.abs() <= 1.0 {
                position += shift;
            }
        }
    }

    let frequency = position * resolution;
    (frequency.is_finite() && frequency >= min_freq && frequency <= max_freq).then_some(frequency)
}
