//! # Detector Configuration
//!
//! Immutable per-session settings for the detection pipeline. A config is
//! validated once when a session or engine is built and then only read.
//!
//! Configs serialize to JSON so a tuned setup can be saved next to the user's
//! other settings and loaded on the next run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::TARGET_SAMPLE_RATE;
use crate::error::{Result, TunerError};
use crate::matching::Instrument;

/// Smallest analysis block a preset uses (~46ms at 44.1 kHz).
pub const DEFAULT_BLOCK_SIZE: usize = 2048;

/// Largest analysis block a preset grows to.
pub const MAX_BLOCK_SIZE: usize = 16_384;

/// Periods of `min_freq` a preset block holds. Fewer leave the tapered
/// block too short for a confident estimate at the bottom of the band.
const PRESET_PERIODS_PER_BLOCK: f32 = 5.0;

/// Periods of `min_freq` any block must hold to be accepted.
const MIN_PERIODS_PER_BLOCK: f32 = 3.0;

/// Smallest power-of-two block, starting at [`DEFAULT_BLOCK_SIZE`], that
/// holds enough periods of `min_freq` at [`TARGET_SAMPLE_RATE`].
pub fn block_size_for(min_freq: f32) -> usize {
    let needed = PRESET_PERIODS_PER_BLOCK * TARGET_SAMPLE_RATE as f32 / min_freq;
    let mut block = DEFAULT_BLOCK_SIZE;
    while (block as f32) < needed && block < MAX_BLOCK_SIZE {
        block *= 2;
    }
    block
}

/// Settings for the frequency band, the estimators, and the accept policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lowest frequency the estimators may report, in Hz.
    pub min_freq: f32,
    /// Highest frequency the estimators may report, in Hz.
    pub max_freq: f32,
    /// CMND dip threshold for the primary estimator.
    pub threshold: f32,
    /// Minimum RMS loudness of a processed block before any estimation runs.
    pub min_rms: f32,
    /// Confidence at or above which an estimate is accepted outright.
    pub min_quality: f32,
    /// Confidence at or above which an estimate is accepted if it continues
    /// the current pitch.
    pub soft_quality: f32,
    /// Accept a first estimate with no history (tuner display) instead of
    /// waiting for a confident one (practice validation).
    pub allow_soft_start: bool,
    /// Samples per analysis block.
    pub block_size: usize,
    /// Linear magnitude below which the spectral peak is treated as noise.
    pub spectral_noise_floor: f32,
    pub smoothing: SmoothingConfig,
}

/// Empirically tuned constants of the temporal stabilizer.
///
/// None of these have a derivation behind them; changing one is a tuning
/// decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Accepted raw frequencies kept for the median filter.
    pub history_len: usize,
    /// Exclusive ratio bounds for continuing the current pitch.
    pub continuity_low: f32,
    pub continuity_high: f32,
    /// Ratios beyond which a new median counts as a jump.
    pub big_jump_low: f32,
    pub big_jump_high: f32,
    pub alpha_steady: f32,
    pub alpha_jump: f32,
    /// Consecutive misses that are bridged before the pitch is dropped.
    pub hold_frames: u32,
    /// Per-frame decay applied while holding.
    pub hold_decay: f32,
    /// Multiples of `min_rms` gating the fallback, soft start and hold.
    pub fallback_rms_factor: f32,
    pub soft_start_rms_factor: f32,
    pub hold_rms_factor: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            history_len: 5,
            continuity_low: 0.86,
            continuity_high: 1.16,
            big_jump_low: 0.85,
            big_jump_high: 1.18,
            alpha_steady: 0.18,
            alpha_jump: 0.08,
            hold_frames: 10,
            hold_decay: 0.995,
            fallback_rms_factor: 1.3,
            soft_start_rms_factor: 1.4,
            hold_rms_factor: 0.7,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::tuner()
    }
}

impl DetectorConfig {
    /// Continuous tuner display: shows a pitch as soon as one is heard.
    pub fn tuner() -> Self {
        let min_freq = 60.0;
        Self {
            min_freq,
            max_freq: 1200.0,
            threshold: 0.15,
            min_rms: 0.01,
            min_quality: 0.9,
            soft_quality: 0.7,
            allow_soft_start: true,
            block_size: block_size_for(min_freq),
            spectral_noise_floor: 0.002,
            smoothing: SmoothingConfig::default(),
        }
    }

    /// Practice validation: a pitch only counts once it is confidently heard.
    pub fn strict() -> Self {
        Self {
            allow_soft_start: false,
            ..Self::tuner()
        }
    }

    /// Narrows the band to cover the instrument's open strings up to
    /// `max_fret`, with half an octave of margin on each side.
    pub fn for_instrument(instrument: &Instrument, max_fret: u32) -> Self {
        let lowest = instrument.lowest_open();
        let highest = instrument.highest_open() * 2f32.powf(max_fret as f32 / 12.0);
        let mut config = Self::tuner();
        config.min_freq = lowest / std::f32::consts::SQRT_2;
        config.max_freq = highest * std::f32::consts::SQRT_2;
        config.block_size = block_size_for(config.min_freq);
        config
    }

    /// Checks every field for a usable range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TunerError::InvalidConfig(msg));

        if !(self.min_freq > 0.0 && self.min_freq < self.max_freq) {
            return invalid(format!(
                "frequency band [{}, {}] must be positive and ordered",
                self.min_freq, self.max_freq
            ));
        }
        for (name, value) in [
            ("threshold", self.threshold),
            ("min_quality", self.min_quality),
            ("soft_quality", self.soft_quality),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must lie in [0, 1], got {value}"));
            }
        }
        if self.soft_quality > self.min_quality {
            return invalid(format!(
                "soft_quality {} exceeds min_quality {}",
                self.soft_quality, self.min_quality
            ));
        }
        if self.min_rms < 0.0 || self.spectral_noise_floor < 0.0 {
            return invalid("loudness thresholds must not be negative".to_string());
        }
        if self.block_size < 2 {
            return invalid(format!("block_size {} is below 2", self.block_size));
        }
        if self.smoothing.history_len == 0 {
            return invalid("smoothing.history_len must be at least 1".to_string());
        }
        Ok(())
    }

    /// Checks that a block at `sample_rate` spans enough lags for the band
    /// and holds a few periods of `min_freq`. Called once the capture rate is
    /// known.
    pub fn validate_for_rate(&self, sample_rate: u32) -> Result<()> {
        let min_tau = (sample_rate as f32 / self.max_freq).floor() as usize;
        let max_tau = (self.block_size / 2).saturating_sub(1);
        if max_tau < min_tau + 2 {
            return Err(TunerError::InvalidConfig(format!(
                "block_size {} at {} Hz cannot resolve pitches up to {} Hz",
                self.block_size, sample_rate, self.max_freq
            )));
        }
        let periods = self.block_size as f32 * self.min_freq / sample_rate as f32;
        if periods < MIN_PERIODS_PER_BLOCK {
            return Err(TunerError::InvalidConfig(format!(
                "block_size {} at {} Hz holds {:.1} periods of {} Hz, need {}",
                self.block_size, sample_rate, periods, self.min_freq, MIN_PERIODS_PER_BLOCK
            )));
        }
        Ok(())
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| TunerError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| TunerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TunerError::Config(e.to_string()))?;
        fs::write(path, json).map_err(|e| TunerError::Config(format!("{}: {e}", path.display())))
    }
}
