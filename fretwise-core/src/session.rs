//! # Tuner Session
//!
//! Owns one capture device and one detection engine. The host drives the
//! session by calling [`TunerSession::tick`] once per display refresh; each
//! tick processes the newest available block and nothing else, so processing
//! never queues up behind capture.
//!
//! `start` and `stop` must be serialized by the caller. `stop` is idempotent
//! and tears everything down before returning: the stream is paused and
//! dropped, pending blocks are discarded, and the tracked pitch is cleared.

use log::{info, warn};

use crate::audio::{self, AudioCapture};
use crate::config::DetectorConfig;
use crate::engine::{FrameReading, PitchEngine};
use crate::error::{Result, TunerError};

struct ActiveCapture {
    capture: AudioCapture,
    engine: PitchEngine,
}

/// A start/stop-able listening session.
pub struct TunerSession {
    config: DetectorConfig,
    active: Option<ActiveCapture>,
}

impl TunerSession {
    /// Creates a stopped session. The config is checked here so a bad config
    /// never reaches the device.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            active: None,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    /// Sample rate of the running capture.
    pub fn sample_rate(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.capture.sample_rate)
    }

    /// Acquires the default input device and starts listening.
    ///
    /// Restarting a running session stops it first, so the new session
    /// begins with empty smoothing state.
    ///
    /// # Errors
    /// * [`TunerError::PermissionDenied`] - The device could not be acquired;
    ///   the session stays stopped
    /// * [`TunerError::InvalidConfig`] - The device's sample rate cannot
    ///   resolve the configured band with this block size
    pub fn start(&mut self) -> Result<()> {
        self.stop();

        let capture = audio::start_audio_capture(self.config.block_size)
            .map_err(|e| TunerError::PermissionDenied(format!("{e:#}")))?;
        let engine = match PitchEngine::new(self.config.clone(), capture.sample_rate) {
            Ok(engine) => engine,
            Err(e) => {
                capture.close();
                return Err(e);
            }
        };

        info!(
            "listening at {} Hz, {}-sample blocks, band {:.1}-{:.1} Hz",
            capture.sample_rate, self.config.block_size, self.config.min_freq, self.config.max_freq
        );
        self.active = Some(ActiveCapture { capture, engine });
        Ok(())
    }

    /// Stops listening and releases the device. Safe to call at any time.
    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.engine.reset();
            active.capture.close();
            info!("stopped listening");
        }
    }

    /// Processes the newest captured block, if one arrived since the last tick.
    ///
    /// # Returns
    /// * `Some(reading)` - One frame's result; a stream fault reported since
    ///   the last tick rides along in `reading.error`
    /// * `None` - Not listening, or no new block yet
    pub fn tick(&mut self) -> Option<FrameReading> {
        let active = self.active.as_mut()?;

        let fault = active.capture.faults.try_iter().last();
        let newest = active.capture.blocks.try_iter().last();

        match (newest, fault) {
            (Some(block), fault) => {
                let mut reading = active.engine.process_block(&block);
                reading.error = fault.map(TunerError::Stream);
                Some(reading)
            }
            (None, Some(fault)) => {
                warn!("stream fault with no audio: {fault}");
                Some(FrameReading {
                    error: Some(TunerError::Stream(fault)),
                    ..FrameReading::default()
                })
            }
            (None, None) => None,
        }
    }
}

impl Drop for TunerSession {
    fn drop(&mut self) {
        self.stop();
    }
}
