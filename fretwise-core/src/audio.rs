//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It selects an input device, opens a stream, and hands fixed-size blocks of
//! the most recent samples to the processing loop.
//!
//! ## Features
//! - Default input device, 32-bit float, sample rate close to 44.1 kHz
//! - Multi-channel input downmixed to mono
//! - Latest-block handoff: the consumer always sees the newest block, stale
//!   blocks are overwritten rather than queued
//! - Stream faults forwarded to the consumer instead of printed

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{info, warn};

/// Preferred capture sample rate.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// A running input stream and the receiving ends of its handoff channels.
///
/// Dropping the capture releases the device.
pub struct AudioCapture {
    stream: cpal::Stream,
    pub sample_rate: u32,
    pub blocks: Receiver<Vec<f32>>,
    pub faults: Receiver<String>,
}

impl AudioCapture {
    /// Stops the stream and releases the device.
    pub fn close(self) {
        if let Err(e) = self.stream.pause() {
            warn!("error pausing input stream: {e}");
        }
        drop(self.stream);
        // Blocks produced before the pause are stale now.
        while self.blocks.try_recv().is_ok() {}
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 configuration at or near [`TARGET_SAMPLE_RATE`]
/// 3. Sets up a callback that downmixes to mono and hands over the most
///    recent `block_size` samples whenever enough new audio has arrived
///
/// # Arguments
/// * `block_size` - Samples per handed-over block
///
/// # Returns
/// * `Ok(capture)` - Running stream with its block and fault receivers
/// * `Err(e)` - No device, no usable format, or the stream failed to start
pub fn start_audio_capture(block_size: usize) -> Result<AudioCapture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = config.channels() as usize;
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    info!("selected sample rate: {sample_rate} Hz, {channels} channel(s)");

    let (block_tx, block_rx) = crossbeam_channel::bounded::<Vec<f32>>(1);
    let (fault_tx, fault_rx) = crossbeam_channel::bounded::<String>(8);

    // The callback keeps its own receiver so it can evict an unread block.
    let evict_rx = block_rx.clone();
    let mut window = BlockWindow::new(block_size);

    let err_fn = move |err: cpal::StreamError| {
        warn!("audio stream error: {err}");
        let _ = fault_tx.try_send(err.to_string());
    };

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if let Some(block) = window.push_interleaved(data, channels) {
                hand_over(&block_tx, &evict_rx, block);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(AudioCapture {
        stream,
        sample_rate,
        blocks: block_rx,
        faults: fault_rx,
    })
}

/// Sends `block`, replacing any block the consumer has not taken yet.
fn hand_over(tx: &Sender<Vec<f32>>, evict: &Receiver<Vec<f32>>, block: Vec<f32>) {
    match tx.try_send(block) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(block)) => {
            let _ = evict.try_recv();
            let _ = tx.try_send(block);
        }
    }
}

/// Sliding window over the mono input.
///
/// Emits a snapshot of the newest `block_size` samples each time at least
/// half a block of new audio has arrived.
#[derive(Debug)]
struct BlockWindow {
    samples: Vec<f32>,
    block_size: usize,
    fresh: usize,
}

impl BlockWindow {
    fn new(block_size: usize) -> Self {
        Self {
            samples: Vec::with_capacity(block_size * 2),
            block_size,
            fresh: 0,
        }
    }

    fn push_interleaved(&mut self, data: &[f32], channels: usize) -> Option<Vec<f32>> {
        let channels = channels.max(1);
        self.samples.extend(
            data.chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
        );
        self.fresh += data.len() / channels;

        if self.samples.len() > self.block_size {
            let excess = self.samples.len() - self.block_size;
            self.samples.drain(..excess);
        }
        if self.samples.len() == self.block_size && self.fresh >= self.block_size / 2 {
            self.fresh = 0;
            return Some(self.samples.clone());
        }
        None
    }
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// This function searches through available audio configurations and selects
/// the one that best matches our requirements:
/// - 32-bit float format
/// - Fewest channels (mono preferred)
/// - Closest sample rate to target
///
/// # Returns
/// * `Some(config)` - Best matching configuration
/// * `None` - No suitable configuration found
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let covers = c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            let rate_diff = if covers { 0 } else { min_diff.min(max_diff) };
            (rate_diff, c.channels())
        })
}
