//! # Fast Fourier Transform (FFT) Module
//!
//! Magnitude spectra for the spectral fallback estimator.
//!
//! ## Features
//! - High-performance FFT using RustFFT, planned once per block size
//! - Magnitudes normalized so a full-scale sine reads close to its amplitude
//! - Linear or decibel scale, converted back to linear on demand

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Scale of the values stored in a [`Spectrum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumScale {
    Linear,
    /// 20·log10 of the linear magnitude.
    Decibels,
}

/// Half-spectrum of one block: bin `k` covers `k * sample_rate / (2 * bins)` Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub magnitudes: Vec<f32>,
    pub scale: SpectrumScale,
}

impl Spectrum {
    pub fn linear(magnitudes: Vec<f32>) -> Self {
        Self {
            magnitudes,
            scale: SpectrumScale::Linear,
        }
    }

    pub fn decibels(magnitudes: Vec<f32>) -> Self {
        Self {
            magnitudes,
            scale: SpectrumScale::Decibels,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }

    /// Width of one bin in Hz.
    pub fn bin_resolution(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / (2 * self.bin_count()) as f32
    }

    /// Linear magnitude of bin `k`.
    pub fn linear_at(&self, k: usize) -> f32 {
        let value = self.magnitudes[k];
        match self.scale {
            SpectrumScale::Linear => value,
            SpectrumScale::Decibels => 10f32.powf(value / 20.0),
        }
    }

    /// Converts to a decibel spectrum, flooring silent bins at -120 dB.
    pub fn to_decibels(&self) -> Spectrum {
        match self.scale {
            SpectrumScale::Decibels => self.clone(),
            SpectrumScale::Linear => Spectrum::decibels(
                self.magnitudes
                    .iter()
                    .map(|&m| 20.0 * m.max(1e-6).log10())
                    .collect(),
            ),
        }
    }
}

/// Forward FFT for a fixed block size.
///
/// Holds the planned transform and a scratch buffer so that a running
/// session does not plan or allocate per frame beyond the output vector.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("block_size", &self.buffer.len())
            .finish()
    }
}

impl SpectrumAnalyzer {
    pub fn new(block_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(block_size),
            buffer: vec![Complex::default(); block_size],
        }
    }

    pub fn block_size(&self) -> usize {
        self.buffer.len()
    }

    /// Computes the linear magnitude half-spectrum of an already windowed block.
    ///
    /// Magnitudes are scaled by `2 / N`; a Hann-windowed sine of amplitude `A`
    /// peaks near `A / 2`.
    ///
    /// # Panics
    /// * If `signal` is not exactly `block_size` samples long
    pub fn magnitudes(&mut self, signal: &[f32]) -> Spectrum {
        assert_eq!(
            signal.len(),
            self.buffer.len(),
            "input frame size must equal the planned block size"
        );

        for (slot, &sample) in self.buffer.iter_mut().zip(signal) {
            *slot = Complex { re: sample, im: 0.0 };
        }
        self.fft.process(&mut self.buffer);

        let n = self.buffer.len();
        let scale = 2.0 / n as f32;
        Spectrum::linear(
            self.buffer
                .iter()
                .take(n / 2)
                .map(|c| c.norm() * scale) // .norm() is sqrt(re^2 + im^2)
                .collect(),
        )
    }
}
