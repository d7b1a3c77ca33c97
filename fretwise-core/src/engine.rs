//! # Detection Engine
//!
//! Runs the whole per-frame pipeline on one block:
//! preprocess → primary estimator → spectral fallback → stabilizer → note naming.
//!
//! The engine owns the only cross-frame state (the [`Stabilizer`]) and never
//! touches an audio device, so it can be driven from a capture session or
//! from synthetic blocks alike.

use crate::config::DetectorConfig;
use crate::error::{Result, TunerError};
use crate::fft::SpectrumAnalyzer;
use crate::pitch::{self, DetectionResult, YinParams};
use crate::preprocess::preprocess;
use crate::spectral;
use crate::stabilizer::{Stabilizer, TrackPhase};
use crate::tuning::{self, NoteInfo};

/// Which estimator produced a frame's raw estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EstimateSource {
    #[default]
    None,
    TimeDomain,
    Spectral,
}

/// Everything the presentation layer needs about one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameReading {
    /// Stabilized pitch in Hz; 0 when no pitch is asserted.
    pub frequency_hz: f32,
    /// RMS of the processed block.
    pub loudness: f32,
    /// Confidence of this frame's raw estimate.
    pub confidence: f32,
    pub source: EstimateSource,
    /// Name of the stabilized pitch.
    pub note: Option<NoteInfo>,
    pub track: TrackPhase,
    /// A device fault surfaced alongside this frame.
    pub error: Option<TunerError>,
}

impl FrameReading {
    pub fn has_pitch(&self) -> bool {
        self.frequency_hz > 0.0
    }
}

/// Per-session detection pipeline.
#[derive(Debug)]
pub struct PitchEngine {
    config: DetectorConfig,
    sample_rate: u32,
    analyzer: SpectrumAnalyzer,
    stabilizer: Stabilizer,
}

impl PitchEngine {
    /// Builds an engine for blocks of `config.block_size` samples at `sample_rate`.
    pub fn new(config: DetectorConfig, sample_rate: u32) -> Result<Self> {
        config.validate()?;
        config.validate_for_rate(sample_rate)?;
        Ok(Self {
            analyzer: SpectrumAnalyzer::new(config.block_size),
            config,
            sample_rate,
            stabilizer: Stabilizer::new(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    /// Forgets the tracked pitch.
    pub fn reset(&mut self) {
        self.stabilizer.reset();
    }

    /// Runs one block through the pipeline.
    ///
    /// Blocks of the wrong length produce a silent reading; the capture layer
    /// always delivers `block_size` samples.
    pub fn process_block(&mut self, block: &[f32]) -> FrameReading {
        if block.len() != self.config.block_size {
            return FrameReading::default();
        }

        let (processed, rms) = preprocess(block);
        let (estimate, source) = self.estimate(&processed, rms);
        let frequency_hz = self.stabilizer.update(&self.config, estimate, rms);

        FrameReading {
            frequency_hz,
            loudness: rms,
            confidence: estimate.confidence,
            source,
            note: tuning::note_from_frequency(frequency_hz),
            track: self.stabilizer.phase(),
            error: None,
        }
    }

    /// Primary estimate, replaced by the spectral peak when the primary is
    /// missing or weak and the block is loud enough.
    fn estimate(&mut self, processed: &[f32], rms: f32) -> (DetectionResult, EstimateSource) {
        let config = &self.config;

        let primary = if rms >= config.min_rms {
            pitch::detect_pitch_yin(
                processed,
                self.sample_rate,
                &YinParams {
                    threshold: config.threshold,
                    min_freq: config.min_freq,
                    max_freq: config.max_freq,
                },
            )
        } else {
            DetectionResult::none()
        };

        let weak = !primary.has_pitch() || primary.confidence < config.soft_quality;
        if weak && rms >= config.min_rms * config.smoothing.fallback_rms_factor {
            let spectrum = self.analyzer.magnitudes(processed);
            if let Some(frequency) = spectral::dominant_frequency(
                &spectrum,
                self.sample_rate,
                config.min_freq,
                config.max_freq,
                config.spectral_noise_floor,
            ) {
                let confidence = primary.confidence.max(config.soft_quality);
                return (
                    DetectionResult::new(frequency, confidence),
                    EstimateSource::Spectral,
                );
            }
        }

        let source = if primary.has_pitch() {
            EstimateSource::TimeDomain
        } else {
            EstimateSource::None
        };
        (primary, source)
    }
}
