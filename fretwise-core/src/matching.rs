//! # Target Matching Module
//!
//! Judges a detected frequency against what the player was supposed to play:
//! a single expected note, the notes of a chord, or any position on a
//! four-string fretboard.

use serde::{Deserialize, Serialize};

use crate::tuning::{cents_between, frequency_from_name};

/// Tolerance used when the caller does not pass one, in cents.
pub const DEFAULT_TOLERANCE_CENTS: f32 = 50.0;

/// Absorbs f32 rounding so the tolerance bounds stay inclusive.
const CENTS_EPSILON: f32 = 1e-3;

/// How close a detected pitch is to its target.
///
/// Presentation code adds its own "waiting" state for targets not evaluated
/// yet; the classifier itself only ever produces these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchVerdict {
    /// Within half the tolerance.
    Correct,
    /// Within the tolerance.
    Close,
    Wrong,
}

impl MatchVerdict {
    fn from_cents(cents: f32, tolerance_cents: f32) -> Self {
        let distance = cents.abs();
        if distance <= tolerance_cents / 2.0 + CENTS_EPSILON {
            MatchVerdict::Correct
        } else if distance <= tolerance_cents + CENTS_EPSILON {
            MatchVerdict::Close
        } else {
            MatchVerdict::Wrong
        }
    }
}

impl std::fmt::Display for MatchVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MatchVerdict::Correct => "correct",
            MatchVerdict::Close => "close",
            MatchVerdict::Wrong => "wrong",
        };
        f.write_str(label)
    }
}

/// Classifies `detected` against a single `expected` frequency.
///
/// A non-positive `detected` (nothing heard) is always [`MatchVerdict::Wrong`].
pub fn classify(detected: f32, expected: f32, tolerance_cents: f32) -> MatchVerdict {
    if detected <= 0.0 || expected <= 0.0 {
        return MatchVerdict::Wrong;
    }
    MatchVerdict::from_cents(cents_between(detected, expected), tolerance_cents)
}

/// The one target a frame was judged against in chord mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMatch {
    /// Index into the caller's expected list.
    pub index: usize,
    pub expected: f32,
    /// Signed distance from the (octave-adjusted) target.
    pub cents: f32,
    pub verdict: MatchVerdict,
}

/// Picks the expected frequency nearest to `detected` and judges only that one.
///
/// A microphone hearing a strum reports a single dominant pitch, so every
/// other target stays unclassified for this frame. With `octave_blind`, each
/// target is also compared one octave up and down.
///
/// # Returns
/// * `Some(found)` - The verdict for the nearest target
/// * `None` - Nothing heard (`detected <= 0`) or no valid targets. This is
///   the caller's "waiting" state: unlike [`classify`], which judges silence
///   against a known target as [`MatchVerdict::Wrong`], there is no nearest
///   target to blame here
pub fn best_match(
    detected: f32,
    expecteds: &[f32],
    tolerance_cents: f32,
    octave_blind: bool,
) -> Option<TargetMatch> {
    if detected <= 0.0 {
        return None;
    }

    expecteds
        .iter()
        .enumerate()
        .filter(|(_, expected)| **expected > 0.0)
        .map(|(index, &expected)| {
            let direct = cents_between(detected, expected);
            let cents = if octave_blind {
                [direct, direct - 1200.0, direct + 1200.0]
                    .into_iter()
                    .min_by(|a, b| a.abs().total_cmp(&b.abs()))
                    .unwrap_or(direct)
            } else {
                direct
            };
            (index, expected, cents)
        })
        .min_by(|a, b| a.2.abs().total_cmp(&b.2.abs()))
        .map(|(index, expected, cents)| TargetMatch {
            index,
            expected,
            cents,
            verdict: MatchVerdict::from_cents(cents, tolerance_cents),
        })
}

/// A four-string fretted instrument, strings listed low to high as strung.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    /// Open-string frequencies in Hz.
    pub strings: [f32; 4],
    /// Display names of the open strings.
    pub string_names: [String; 4],
}

impl Instrument {
    /// Builds an instrument from note names such as `["G4", "C4", "E4", "A4"]`.
    pub fn from_names(name: &str, names: [&str; 4]) -> Option<Self> {
        let mut strings = [0.0; 4];
        for (slot, note) in strings.iter_mut().zip(names) {
            *slot = frequency_from_name(note)?;
        }
        Some(Self {
            name: name.to_string(),
            strings,
            string_names: names.map(str::to_string),
        })
    }

    /// Standard (re-entrant) ukulele, G4 C4 E4 A4.
    pub fn ukulele() -> Self {
        Self::preset("ukulele", ["G4", "C4", "E4", "A4"])
    }

    /// Low-G ukulele, G3 C4 E4 A4.
    pub fn ukulele_low_g() -> Self {
        Self::preset("ukulele-low-g", ["G3", "C4", "E4", "A4"])
    }

    /// Baritone ukulele, D3 G3 B3 E4.
    pub fn baritone_ukulele() -> Self {
        Self::preset("baritone-ukulele", ["D3", "G3", "B3", "E4"])
    }

    /// Four-string bass, E1 A1 D2 G2.
    pub fn bass() -> Self {
        Self::preset("bass", ["E1", "A1", "D2", "G2"])
    }

    pub fn presets() -> Vec<Self> {
        vec![
            Self::ukulele(),
            Self::ukulele_low_g(),
            Self::baritone_ukulele(),
            Self::bass(),
        ]
    }

    /// Finds a preset by its name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::presets().into_iter().find(|i| i.name == name)
    }

    fn preset(name: &str, names: [&str; 4]) -> Self {
        // Presets only use names from the C0..B8 table.
        Self::from_names(name, names).unwrap_or_else(|| unreachable!("unknown note in preset {name}"))
    }

    pub fn lowest_open(&self) -> f32 {
        self.strings.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn highest_open(&self) -> f32 {
        self.strings.iter().copied().fold(0.0, f32::max)
    }

    /// Frequencies of every string stopped at `fret`.
    pub fn string_frequencies(&self, fret: u32) -> [f32; 4] {
        self.strings.map(|open| fret_frequency(open, fret))
    }
}

/// Frequency of a string with open pitch `open` stopped at `fret`.
pub fn fret_frequency(open: f32, fret: u32) -> f32 {
    open * 2f32.powf(fret as f32 / 12.0)
}

/// A fretboard position matching a detected pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FretPosition {
    /// Index into [`Instrument::strings`].
    pub string: usize,
    pub fret: u32,
    pub cents: f32,
}

/// Searches every string and fret up to `max_fret` for the position closest
/// to `detected`.
///
/// # Returns
/// * `Some(position)` - Closest position within `tolerance_cents`; ties keep
///   the lower string index
/// * `None` - Nothing heard or no position within tolerance
pub fn find_string_fret(
    detected: f32,
    strings: &[f32],
    max_fret: u32,
    tolerance_cents: f32,
) -> Option<FretPosition> {
    if detected <= 0.0 {
        return None;
    }

    strings
        .iter()
        .enumerate()
        .filter(|(_, open)| **open > 0.0)
        .flat_map(|(string, &open)| {
            (0..=max_fret).map(move |fret| FretPosition {
                string,
                fret,
                cents: cents_between(detected, fret_frequency(open, fret)),
            })
        })
        .filter(|position| position.cents.abs() <= tolerance_cents + CENTS_EPSILON)
        .min_by(|a, b| a.cents.abs().total_cmp(&b.cents.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifted(frequency: f32, cents: f32) -> f32 {
        (frequency as f64 * 2f64.powf(cents as f64 / 1200.0)) as f32
    }

    #[test]
    fn tolerance_bounds_are_inclusive() {
        let tolerance = DEFAULT_TOLERANCE_CENTS;
        assert_eq!(classify(440.0, 440.0, tolerance), MatchVerdict::Correct);
        assert_eq!(classify(shifted(440.0, 25.0), 440.0, tolerance), MatchVerdict::Correct);
        assert_eq!(classify(shifted(440.0, -25.0), 440.0, tolerance), MatchVerdict::Correct);
        assert_eq!(classify(shifted(440.0, 25.5), 440.0, tolerance), MatchVerdict::Close);
        assert_eq!(classify(shifted(440.0, 50.0), 440.0, tolerance), MatchVerdict::Close);
        assert_eq!(classify(shifted(440.0, -50.0), 440.0, tolerance), MatchVerdict::Close);
        assert_eq!(classify(shifted(440.0, 50.01), 440.0, tolerance), MatchVerdict::Wrong);
    }

    #[test]
    fn a_quarter_tone_sharp_is_wrong() {
        assert_eq!(classify(453.0, 440.0, DEFAULT_TOLERANCE_CENTS), MatchVerdict::Wrong);
    }

    #[test]
    fn nothing_heard_is_wrong() {
        assert_eq!(classify(0.0, 440.0, DEFAULT_TOLERANCE_CENTS), MatchVerdict::Wrong);
        assert_eq!(classify(-1.0, 440.0, DEFAULT_TOLERANCE_CENTS), MatchVerdict::Wrong);
    }

    #[test]
    fn best_match_judges_only_the_nearest_target() {
        // C major triad: C4 E4 G4.
        let chord = [261.63, 329.63, 392.0];
        let found = best_match(331.0, &chord, DEFAULT_TOLERANCE_CENTS, false).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.verdict, MatchVerdict::Correct);

        let found = best_match(350.0, &chord, DEFAULT_TOLERANCE_CENTS, false).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.verdict, MatchVerdict::Wrong);
    }

    #[test]
    fn octave_blind_matching_folds_octaves() {
        let chord = [261.63, 329.63, 392.0];
        let strict = best_match(784.0, &chord, DEFAULT_TOLERANCE_CENTS, false).unwrap();
        assert_eq!(strict.verdict, MatchVerdict::Wrong);

        let blind = best_match(784.0, &chord, DEFAULT_TOLERANCE_CENTS, true).unwrap();
        assert_eq!(blind.index, 2);
        assert_eq!(blind.verdict, MatchVerdict::Correct);
        assert!(blind.cents.abs() < 1.0);
    }

    #[test]
    fn best_match_without_input_is_none() {
        assert_eq!(best_match(0.0, &[440.0], 50.0, false), None);
        assert_eq!(best_match(-1.0, &[440.0, 523.25], 50.0, true), None);
        // A single target judged directly still reads silence as wrong.
        assert_eq!(classify(0.0, 440.0, 50.0), MatchVerdict::Wrong);
        assert_eq!(best_match(440.0, &[], 50.0, false), None);
    }

    #[test]
    fn presets_resolve() {
        let uke = Instrument::ukulele();
        assert!((uke.strings[3] - 440.0).abs() < 1e-3);
        assert!((uke.lowest_open() - 261.63).abs() < 0.01);
        assert!((uke.highest_open() - 440.0).abs() < 1e-3);
        assert_eq!(Instrument::by_name("bass"), Some(Instrument::bass()));
        assert_eq!(Instrument::by_name("banjo"), None);
    }

    #[test]
    fn twelfth_fret_is_an_octave() {
        let frets = Instrument::ukulele().string_frequencies(12);
        assert!((frets[3] - 880.0).abs() < 1e-2);
    }

    #[test]
    fn finds_the_fret_for_a_pitch() {
        let uke = Instrument::ukulele();
        // B4 is the A string at fret 2; the G string reaches it only at fret 4.
        let found = find_string_fret(493.88, &uke.strings, 3, DEFAULT_TOLERANCE_CENTS).unwrap();
        assert_eq!((found.string, found.fret), (3, 2));
        assert!(found.cents.abs() < 1.0);
    }

    #[test]
    fn fret_search_respects_ceiling_and_tolerance() {
        let uke = Instrument::ukulele();
        // C6 needs fret 15 on the A string.
        assert_eq!(find_string_fret(1046.5, &uke.strings, 12, 50.0), None);
        assert!(find_string_fret(1046.5, &uke.strings, 15, 50.0).is_some());
        assert_eq!(find_string_fret(0.0, &uke.strings, 12, 50.0), None);
    }
}
