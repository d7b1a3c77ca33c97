//! # Error Types
//!
//! Only acquiring the capture device can fail in a way the caller has to act
//! on. Silence, low confidence and numerical corner cases are carried as
//! "no pitch" readings instead (see [`crate::pitch::DetectionResult`]).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TunerError {
    /// The audio input device could not be acquired. Capture stays stopped;
    /// the caller has to `start` again.
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    #[error("invalid detector config: {0}")]
    InvalidConfig(String),

    /// A fault reported by the running input stream.
    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("config file: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TunerError>;
