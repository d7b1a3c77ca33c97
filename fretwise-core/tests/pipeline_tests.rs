use fretwise_core::{
    DEFAULT_TOLERANCE_CENTS, DetectionResult, DetectorConfig, EstimateSource, FrameReading,
    Instrument, MatchVerdict, PitchEngine, Stabilizer, TrackPhase, best_match, classify,
    find_string_fret, note_from_frequency,
};
use std::f32::consts::PI;

const SAMPLE_RATE: u32 = 44_100;

/// Consecutive blocks of a continuous sine, sized for the tuner presets.
fn sine_frames(frequency: f32, amplitude: f32, frames: usize) -> Vec<Vec<f32>> {
    let block = DetectorConfig::tuner().block_size;
    (0..frames)
        .map(|frame| {
            (0..block)
                .map(|i| {
                    let t = (frame * block + i) as f32 / SAMPLE_RATE as f32;
                    amplitude * (2.0 * PI * frequency * t).sin()
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_a4_end_to_end() {
    let mut engine = PitchEngine::new(DetectorConfig::tuner(), SAMPLE_RATE).unwrap();
    let mut frequency = 0.0;
    for block in sine_frames(440.0, 0.5, 10) {
        frequency = engine.process_block(&block).frequency_hz;
    }

    assert_eq!(classify(frequency, 440.0, DEFAULT_TOLERANCE_CENTS), MatchVerdict::Correct);
    assert_eq!(classify(453.0, 440.0, DEFAULT_TOLERANCE_CENTS), MatchVerdict::Wrong);

    let note = note_from_frequency(440.0).unwrap();
    assert_eq!((note.name(), note.octave, note.cents), ("A", 4, 0));
}

#[test]
fn test_silence_never_reports_a_pitch() {
    let mut engine = PitchEngine::new(DetectorConfig::tuner(), SAMPLE_RATE).unwrap();
    for _ in 0..5 {
        let reading = engine.process_block(&vec![0.0; DetectorConfig::tuner().block_size]);
        assert_eq!(reading.frequency_hz, 0.0);
        assert_eq!(reading.loudness, 0.0);
        assert_eq!(reading.source, EstimateSource::None);
        assert_eq!(reading.track, TrackPhase::Idle);
    }
}

#[test]
fn test_tone_then_silence_holds_then_drops() {
    let config = DetectorConfig::tuner();
    let mut engine = PitchEngine::new(config.clone(), SAMPLE_RATE).unwrap();
    for block in sine_frames(330.0, 0.5, 6) {
        engine.process_block(&block);
    }
    assert_eq!(engine.stabilizer().phase(), TrackPhase::Tracking);

    // Plain silence is below the hold loudness gate, so the pitch drops at once.
    let reading = engine.process_block(&vec![0.0; DetectorConfig::tuner().block_size]);
    assert_eq!(reading.frequency_hz, 0.0);
    assert_eq!(reading.track, TrackPhase::Idle);
    assert_eq!(reading.note, None);
}

#[test]
fn test_strict_mode_waits_for_confidence() {
    let mut engine = PitchEngine::new(DetectorConfig::strict(), SAMPLE_RATE).unwrap();
    let reading = engine.process_block(&sine_frames(262.0, 0.5, 1)[0]);
    // A clean sine is confident, so even strict mode accepts it.
    assert!(reading.has_pitch());
    assert!(reading.confidence >= DetectorConfig::strict().min_quality);
}

#[test]
fn test_strict_mode_reports_low_strings() {
    // A2, the open A string of a guitar, near the bottom of the default band.
    let config = DetectorConfig::strict();
    let mut engine = PitchEngine::new(config.clone(), SAMPLE_RATE).unwrap();
    let mut reading = FrameReading::default();
    for block in sine_frames(110.0, 0.5, 6) {
        reading = engine.process_block(&block);
    }
    assert_eq!(reading.source, EstimateSource::TimeDomain);
    assert!(reading.confidence >= config.min_quality, "{reading:?}");
    assert!((reading.frequency_hz - 110.0).abs() < 1.1, "{reading:?}");
    let note = reading.note.unwrap();
    assert_eq!((note.name(), note.octave), ("A", 2));
}

#[test]
fn test_octave_jump_is_held_at_the_tracked_pitch() {
    let config = DetectorConfig::tuner();
    let mut stabilizer = Stabilizer::new();
    for _ in 0..5 {
        stabilizer.update(&config, DetectionResult::new(196.0, 0.95), 0.1);
    }
    let shown = stabilizer.update(&config, DetectionResult::new(392.0, 0.8), 0.1);
    assert!((shown - 196.0).abs() < 0.01, "showed {shown}");
    let shown = stabilizer.update(&config, DetectionResult::new(98.0, 0.8), 0.1);
    assert!((shown - 196.0).abs() < 0.01, "showed {shown}");
}

#[test]
fn test_hold_decays_exactly_then_clears_on_eleventh_miss() {
    let config = DetectorConfig::tuner();
    let mut stabilizer = Stabilizer::new();
    let start = stabilizer.update(&config, DetectionResult::new(440.0, 0.95), 0.1);
    assert_eq!(start, 440.0);

    let hold_rms = config.min_rms * 0.7;
    let mut expected = start;
    for _ in 0..10 {
        expected *= 0.995;
        let shown = stabilizer.update(&config, DetectionResult::none(), hold_rms);
        assert_eq!(shown, expected);
        assert!(shown > 0.0);
    }
    assert_eq!(stabilizer.update(&config, DetectionResult::none(), hold_rms), 0.0);
}

#[test]
fn test_note_names_round_trip() {
    let mut frequency = 41.0;
    while frequency < 2000.0 {
        let note = note_from_frequency(frequency).unwrap();
        let again = note_from_frequency(note.frequency()).unwrap();
        assert_eq!((again.name(), again.octave), (note.name(), note.octave));
        frequency *= 1.029;
    }
}

#[test]
fn test_chord_practice_judges_one_target() {
    // G major on ukulele: G4 B4 D5 (plus the G4 string).
    let chord = [392.0, 493.88, 587.33];
    let found = best_match(588.5, &chord, DEFAULT_TOLERANCE_CENTS, false).unwrap();
    assert_eq!(found.index, 2);
    assert_eq!(found.verdict, MatchVerdict::Correct);

    let found = best_match(196.5, &chord, DEFAULT_TOLERANCE_CENTS, true).unwrap();
    assert_eq!(found.index, 0);
    assert_eq!(found.verdict, MatchVerdict::Correct);
}

#[test]
fn test_fret_lookup_on_bass() {
    let bass = Instrument::bass();
    // A2 is the D string at fret 7 or the G string at fret 2.
    let found = find_string_fret(110.0, &bass.strings, 5, DEFAULT_TOLERANCE_CENTS).unwrap();
    assert_eq!((found.string, found.fret), (3, 2));
}

#[test]
fn test_config_json_round_trip() {
    let path = std::env::temp_dir().join(format!("fretwise-config-{}.json", std::process::id()));
    let mut config = DetectorConfig::strict();
    config.min_freq = 70.0;
    config.smoothing.hold_frames = 6;

    config.save(&path).unwrap();
    let loaded = DetectorConfig::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, config);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let result = DetectorConfig::load("/nonexistent/fretwise.json");
    assert!(matches!(result, Err(fretwise_core::TunerError::Config(_))));
}
