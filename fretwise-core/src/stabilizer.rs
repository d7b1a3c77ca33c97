//! # Temporal Stabilizer
//!
//! Fuses per-frame estimates into one slowly varying pitch that a person can
//! read off a needle. Raw estimates flicker: they jump octaves, drop out for a
//! frame or two between strums, and jitter by a few cents. The stabilizer
//! gates estimates by confidence and continuity, median-filters the accepted
//! ones, smooths the median exponentially, and bridges short dropouts.
//!
//! The tracking state is an explicit machine:
//!
//! ```text
//!   Idle --accept--> Tracking --miss--> Holding --miss (> hold_frames)--> Idle
//!                       ^                  |
//!                       +-----accept-------+
//! ```

use std::collections::VecDeque;

use log::debug;

use crate::config::DetectorConfig;
use crate::pitch::DetectionResult;

/// Where the stabilizer is in its acquire/hold/lose cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackState {
    /// No pitch asserted.
    Idle,
    /// The last frame produced an accepted estimate.
    Tracking { smoothed: f32 },
    /// Bridging `misses` consecutive frames without an accepted estimate.
    Holding { smoothed: f32, misses: u32 },
}

/// [`TrackState`] without its payload, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackPhase {
    #[default]
    Idle,
    Tracking,
    Holding,
}

/// Cross-frame smoothing state for one detector session.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    state: TrackState,
    /// Recently accepted raw frequencies, oldest first.
    history: VecDeque<f32>,
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stabilizer {
    pub fn new() -> Self {
        Self {
            state: TrackState::Idle,
            history: VecDeque::new(),
        }
    }

    /// Drops the pitch and the history. Called when listening starts or stops.
    pub fn reset(&mut self) {
        self.state = TrackState::Idle;
        self.history.clear();
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn phase(&self) -> TrackPhase {
        match self.state {
            TrackState::Idle => TrackPhase::Idle,
            TrackState::Tracking { .. } => TrackPhase::Tracking,
            TrackState::Holding { .. } => TrackPhase::Holding,
        }
    }

    /// The currently asserted pitch in Hz, or 0 when none is.
    pub fn smoothed(&self) -> f32 {
        match self.state {
            TrackState::Idle => 0.0,
            TrackState::Tracking { smoothed } | TrackState::Holding { smoothed, .. } => smoothed,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        self.history.iter().copied()
    }

    /// Advances one frame and returns the pitch to display (0 for none).
    ///
    /// # Arguments
    /// * `config` - Session config; only read
    /// * `estimate` - This frame's fused estimator output
    /// * `rms` - Loudness of this frame's processed block
    pub fn update(&mut self, config: &DetectorConfig, estimate: DetectionResult, rms: f32) -> f32 {
        match self.accept(config, estimate, rms) {
            Some(frequency) => self.track(config, frequency),
            None => self.miss(config, rms),
        }
    }

    /// Decides whether this frame's estimate is used, and at which octave.
    fn accept(&self, config: &DetectorConfig, estimate: DetectionResult, rms: f32) -> Option<f32> {
        if !estimate.has_pitch() {
            return None;
        }
        let smoothing = &config.smoothing;
        let prev = self.smoothed();

        let candidate = if estimate.confidence >= config.min_quality {
            Some(estimate.frequency_hz)
        } else if estimate.confidence >= config.soft_quality && prev > 0.0 {
            let candidate = resolve_octave(estimate.frequency_hz, prev);
            let ratio = candidate / prev;
            (ratio > smoothing.continuity_low && ratio < smoothing.continuity_high)
                .then_some(candidate)
        } else if config.allow_soft_start
            && prev == 0.0
            && rms >= config.min_rms * smoothing.soft_start_rms_factor
        {
            Some(estimate.frequency_hz)
        } else {
            None
        };

        candidate.filter(|&f| in_band(config, f))
    }

    fn track(&mut self, config: &DetectorConfig, accepted: f32) -> f32 {
        let smoothing = &config.smoothing;

        self.history.push_back(accepted);
        while self.history.len() > smoothing.history_len {
            self.history.pop_front();
        }
        let median = median(&self.history);

        let prev = self.smoothed();
        let next = if prev > 0.0 {
            let median = resolve_octave_in_band(median, prev, config);
            let ratio = median / prev;
            let alpha = if ratio > smoothing.big_jump_high || ratio < smoothing.big_jump_low {
                smoothing.alpha_jump
            } else {
                smoothing.alpha_steady
            };
            prev * (1.0 - alpha) + median * alpha
        } else {
            debug!("acquired pitch at {median:.2} Hz");
            median
        };

        self.state = TrackState::Tracking { smoothed: next };
        next
    }

    fn miss(&mut self, config: &DetectorConfig, rms: f32) -> f32 {
        let smoothing = &config.smoothing;
        let (smoothed, misses) = match self.state {
            TrackState::Idle => return 0.0,
            TrackState::Tracking { smoothed } => (smoothed, 1),
            TrackState::Holding { smoothed, misses } => (smoothed, misses + 1),
        };

        let held = smoothed * smoothing.hold_decay;
        let can_hold = config.allow_soft_start
            && misses <= smoothing.hold_frames
            && rms >= config.min_rms * smoothing.hold_rms_factor
            && held >= config.min_freq;

        if can_hold {
            self.state = TrackState::Holding {
                smoothed: held,
                misses,
            };
            held
        } else {
            debug!("lost pitch after {misses} missed frame(s)");
            self.reset();
            0.0
        }
    }
}

/// Picks whichever of `frequency`, half of it, or double it lies closest to
/// `reference`. Ties keep `frequency`.
pub fn resolve_octave(frequency: f32, reference: f32) -> f32 {
    octave_candidates(frequency)
        .into_iter()
        .min_by(|a, b| (a - reference).abs().total_cmp(&(b - reference).abs()))
        .unwrap_or(frequency)
}

fn resolve_octave_in_band(frequency: f32, reference: f32, config: &DetectorConfig) -> f32 {
    octave_candidates(frequency)
        .into_iter()
        .filter(|&f| in_band(config, f))
        .min_by(|a, b| (a - reference).abs().total_cmp(&(b - reference).abs()))
        .unwrap_or(frequency)
}

fn octave_candidates(frequency: f32) -> [f32; 3] {
    [frequency, frequency / 2.0, frequency * 2.0]
}

fn in_band(config: &DetectorConfig, frequency: f32) -> bool {
    frequency >= config.min_freq && frequency <= config.max_freq
}

/// Median of a non-empty history; the upper middle for even lengths, so the
/// result is always an observed value.
fn median(values: &VecDeque<f32>) -> f32 {
    let mut sorted: Vec<f32> = values.iter().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted[sorted.len() / 2]
}
