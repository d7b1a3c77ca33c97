// fretwise-core/src/lib.rs

//! The core logic for the fretwise tuner and practice trainer.
//! This crate is responsible for audio capture, pitch detection,
//! temporal smoothing, and matching detected pitches against musical
//! targets. It is completely headless and contains no presentation code.
//!
//! Data flows one frame at a time:
//! capture → [`preprocess`] → {[`pitch`], [`spectral`]} → [`stabilizer`] →
//! [`tuning`] / [`matching`].

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod fft;
pub mod matching;
pub mod pitch;
pub mod preprocess;
pub mod session;
pub mod spectral;
pub mod stabilizer;
pub mod tuning;

pub use config::{DetectorConfig, SmoothingConfig, block_size_for};
pub use engine::{EstimateSource, FrameReading, PitchEngine};
pub use error::{Result, TunerError};
pub use matching::{
    DEFAULT_TOLERANCE_CENTS, FretPosition, Instrument, MatchVerdict, TargetMatch, best_match,
    classify, find_string_fret,
};
pub use pitch::DetectionResult;
pub use session::TunerSession;
pub use stabilizer::{Stabilizer, TrackPhase, TrackState};
pub use tuning::{NoteInfo, note_from_frequency};
