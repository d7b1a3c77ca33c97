//! # Musical Tuning Module
//!
//! Equal-temperament note naming for detected frequencies (A4 = 440 Hz).
//!
//! ## Features
//! - Frequency to note name, octave and cents offset
//! - Note name (e.g. "C#4", "Bb2") to frequency lookups
//! - Cent distance between two frequencies

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Chromatic pitch-class names, starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Frequency of C0, 57 semitones below A4 = 440 Hz.
pub const C0_HZ: f32 = 16.351_598;

/// Nearest equal-tempered note to a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteInfo {
    /// Index into [`NOTE_NAMES`].
    pub pitch_class: u8,
    pub octave: i32,
    /// Offset from the named note, in (-50, 50].
    pub cents: i32,
}

impl NoteInfo {
    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.pitch_class as usize]
    }

    /// Exact frequency of the named note, ignoring the cents offset.
    pub fn frequency(&self) -> f32 {
        note_frequency(self.pitch_class, self.octave)
    }
}

impl std::fmt::Display for NoteInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{} {:+}c", self.name(), self.octave, self.cents)
    }
}

/// Names the nearest note to a frequency.
///
/// Cents are rounded first, so a pitch exactly halfway between two notes is
/// reported as +50 on the lower one. The octave follows the named note, so a
/// slightly flat C5 reads as C5, not C4.
///
/// # Returns
/// * `None` for zero, negative, or non-finite input ("no note")
pub fn note_from_frequency(frequency: f32) -> Option<NoteInfo> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return None;
    }
    let half_steps = 12.0 * (frequency as f64 / C0_HZ as f64).log2();
    let total_cents = (half_steps * 100.0).round() as i64;

    // Nearest semitone n such that total - 100n lies in (-50, 50].
    let semitone = (total_cents + 49).div_euclid(100);
    let cents = (total_cents - semitone * 100) as i32;

    Some(NoteInfo {
        pitch_class: semitone.rem_euclid(12) as u8,
        octave: semitone.div_euclid(12) as i32,
        cents,
    })
}

/// Frequency of pitch class `pitch_class` (0 = C) in `octave`.
pub fn note_frequency(pitch_class: u8, octave: i32) -> f32 {
    let semitones = octave as f64 * 12.0 + pitch_class as f64;
    (C0_HZ as f64 * 2f64.powf(semitones / 12.0)) as f32
}

/// Note names from C0 to B8, sharps and flats both spelled out.
static NOTE_MAP: Lazy<BTreeMap<String, f32>> = Lazy::new(|| {
    const FLATS: [Option<&str>; 12] = [
        None,
        Some("Db"),
        None,
        Some("Eb"),
        None,
        None,
        Some("Gb"),
        None,
        Some("Ab"),
        None,
        Some("Bb"),
        None,
    ];
    let mut map = BTreeMap::new();
    for octave in 0..=8 {
        for (pitch_class, name) in NOTE_NAMES.iter().enumerate() {
            let frequency = note_frequency(pitch_class as u8, octave);
            map.insert(format!("{name}{octave}"), frequency);
            if let Some(flat) = FLATS[pitch_class] {
                map.insert(format!("{flat}{octave}"), frequency);
            }
        }
    }
    map
});

/// Looks up a note such as "A4", "C#3" or "Bb2".
///
/// # Returns
/// * `Some(frequency)` - Equal-tempered frequency in Hz
/// * `None` - Unknown spelling or octave outside 0..=8
pub fn frequency_from_name(name: &str) -> Option<f32> {
    NOTE_MAP.get(name.trim()).copied()
}

/// Calculates the deviation of `freq` from `target_freq` in cents.
///
/// Positive values are sharp, negative values flat.
pub fn cents_between(freq: f32, target_freq: f32) -> f32 {
    (1200.0 * (freq as f64 / target_freq as f64).log2()) as f32
}
