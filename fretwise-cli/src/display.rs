//! # Terminal Display
//!
//! One status line per frame, redrawn in place: a text cent meter with a
//! needle, the note name, and the verdict of whichever mode is running.

use std::io::Write;

use fretwise_core::{FrameReading, FretPosition, Instrument, TargetMatch, TrackPhase};

/// Maximum cent deviation shown on the meter (-50 to +50 cents).
const METER_RANGE: f32 = 50.0;

/// Width of the meter in characters; odd so there is a center mark.
const METER_WIDTH: usize = 41;

/// Overwrites the current terminal line.
pub fn redraw(line: &str) {
    let mut stdout = std::io::stdout().lock();
    // Erase to end of line so a shorter line leaves no residue.
    let _ = write!(stdout, "\r{line}\x1b[K");
    let _ = stdout.flush();
}

/// Renders the cent meter, e.g. `[-------|---*-------]`.
///
/// The needle is `*` within 5 cents, `+` within 20, and `!` beyond.
fn meter(cents: Option<f32>) -> String {
    let center = METER_WIDTH / 2;
    let mut cells: Vec<char> = (0..METER_WIDTH)
        .map(|i| if i == center { '|' } else { '-' })
        .collect();

    if let Some(c) = cents {
        let clamped = c.clamp(-METER_RANGE, METER_RANGE);
        let position = ((clamped + METER_RANGE) / (2.0 * METER_RANGE) * (METER_WIDTH - 1) as f32)
            .round() as usize;
        cells[position.min(METER_WIDTH - 1)] = if c.abs() < 5.0 {
            '*'
        } else if c.abs() < 20.0 {
            '+'
        } else {
            '!'
        };
    }

    format!("[{}]", cells.into_iter().collect::<String>())
}

fn status(reading: &FrameReading) -> &'static str {
    match reading.track {
        TrackPhase::Idle | TrackPhase::Tracking => "      ",
        TrackPhase::Holding => "(hold)",
    }
}

pub fn tuner_line(reading: &FrameReading) -> String {
    match reading.note {
        Some(note) => format!(
            "{:>8.2} Hz  {:<4} {:+3}c {} {} vol {:.3}",
            reading.frequency_hz,
            format!("{}{}", note.name(), note.octave),
            note.cents,
            meter(Some(note.cents as f32)),
            status(reading),
            reading.loudness
        ),
        None => format!("      -- Hz  --        {}        vol {:.3}", meter(None), reading.loudness),
    }
}

pub fn practice_line(reading: &FrameReading, names: &[String], verdict: Option<TargetMatch>) -> String {
    match verdict {
        Some(found) => format!(
            "{:>8.2} Hz  target {:<4} {:+6.1}c {} {}",
            reading.frequency_hz,
            names[found.index],
            found.cents,
            meter(Some(found.cents)),
            found.verdict
        ),
        // Nothing evaluated yet.
        None => format!("      -- Hz  waiting for one of {}", names.join(" ")),
    }
}

pub fn fret_line(reading: &FrameReading, instrument: &Instrument, position: Option<FretPosition>) -> String {
    match (reading.note, position) {
        (Some(note), Some(position)) => format!(
            "{:>8.2} Hz  {}{:<3} {} string, fret {:<2} {:+6.1}c {}",
            reading.frequency_hz,
            note.name(),
            note.octave,
            instrument.string_names[position.string],
            position.fret,
            position.cents,
            status(reading)
        ),
        (Some(note), None) => format!(
            "{:>8.2} Hz  {}{:<3} not playable on {}",
            reading.frequency_hz,
            note.name(),
            note.octave,
            instrument.name
        ),
        _ => "      -- Hz".to_string(),
    }
}
