//! # fretwise - Tuner and Practice Trainer
//!
//! Terminal front-end for `fretwise-core`. It stands in for a graphical
//! presentation layer: it owns one [`TunerSession`], drives it once per
//! display frame, and prints what the session reports.
//!
//! ## Architecture
//! - **Frame loop**: a crossbeam `tick` channel fires every 16ms (~60 FPS);
//!   each tick processes the newest captured block, nothing is queued
//! - **Capture**: cpal callback inside the core, handing over the latest block
//! - **Shutdown**: the session is stopped explicitly before the loop exits

mod display;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fretwise_core::{
    DEFAULT_TOLERANCE_CENTS, DetectorConfig, FrameReading, Instrument, TunerError, TunerSession,
    best_match, find_string_fret, tuning,
};
use tracing::{error, info};

/// Display refresh interval driving the per-frame loop.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Fret search ceiling for the `frets` command.
const DEFAULT_MAX_FRET: u32 = 12;

#[derive(Parser, Debug)]
#[command(name = "fretwise", version, about = "Real-time tuner and fretting practice trainer")]
struct Cli {
    /// JSON detector config; presets apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only accept confidently detected pitches (practice validation).
    #[arg(long, global = true)]
    strict: bool,

    /// Stop after this many seconds instead of running until interrupted.
    #[arg(long, global = true)]
    seconds: Option<f32>,

    /// Log detector state transitions.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the detected note and its cents offset.
    Tune,
    /// Judge each frame against a set of expected notes.
    Practice {
        /// Expected notes, e.g. "G4,B4,D5".
        #[arg(long, value_delimiter = ',', required = true)]
        expect: Vec<String>,
        /// Accept the expected notes in any octave.
        #[arg(long)]
        octave_blind: bool,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE_CENTS)]
        tolerance: f32,
    },
    /// Show which string and fret produce the detected pitch.
    Frets {
        /// One of: ukulele, ukulele-low-g, baritone-ukulele, bass.
        #[arg(long, default_value = "ukulele")]
        instrument: String,
        #[arg(long, default_value_t = DEFAULT_MAX_FRET)]
        max_fret: u32,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE_CENTS)]
        tolerance: f32,
    },
    /// Print the effective detector config as JSON.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let instrument = match &cli.command {
        Command::Frets { instrument, .. } => Some(
            Instrument::by_name(instrument)
                .with_context(|| format!("unknown instrument '{instrument}'"))?,
        ),
        _ => None,
    };
    let config = effective_config(&cli, instrument.as_ref())?;

    match &cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Tune => run(config, cli.seconds, |reading| {
            display::tuner_line(reading)
        }),
        Command::Practice {
            expect,
            octave_blind,
            tolerance,
        } => {
            let targets = parse_targets(expect)?;
            let (octave_blind, tolerance) = (*octave_blind, *tolerance);
            run(config, cli.seconds, move |reading| {
                let verdict = best_match(reading.frequency_hz, &targets, tolerance, octave_blind);
                display::practice_line(reading, expect, verdict)
            })
        }
        Command::Frets {
            max_fret,
            tolerance,
            ..
        } => {
            let instrument = instrument.context("instrument resolved above")?;
            let (max_fret, tolerance) = (*max_fret, *tolerance);
            run(config, cli.seconds, move |reading| {
                let position =
                    find_string_fret(reading.frequency_hz, &instrument.strings, max_fret, tolerance);
                display::fret_line(reading, &instrument, position)
            })
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file if given, otherwise the instrument's band or the tuner preset.
fn effective_config(cli: &Cli, instrument: Option<&Instrument>) -> Result<DetectorConfig> {
    let mut config = match (&cli.config, instrument) {
        (Some(path), _) => DetectorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        (None, Some(instrument)) => DetectorConfig::for_instrument(instrument, DEFAULT_MAX_FRET),
        (None, None) => DetectorConfig::tuner(),
    };
    if cli.strict {
        config.allow_soft_start = false;
    }
    config.validate()?;
    Ok(config)
}

fn parse_targets(names: &[String]) -> Result<Vec<f32>> {
    names
        .iter()
        .map(|name| {
            tuning::frequency_from_name(name)
                .with_context(|| format!("'{name}' is not a note name like A4 or C#3"))
        })
        .collect()
}

/// Drives the session at display rate and prints one line per frame.
fn run<F>(config: DetectorConfig, seconds: Option<f32>, mut render: F) -> Result<()>
where
    F: FnMut(&FrameReading) -> String,
{
    let mut session = TunerSession::new(config)?;
    match session.start() {
        Ok(()) => {}
        Err(TunerError::PermissionDenied(reason)) => {
            bail!("cannot listen: {reason}. Check that a microphone is connected and allowed.")
        }
        Err(e) => return Err(e.into()),
    }
    info!(
        "listening at {} Hz",
        session.sample_rate().unwrap_or_default()
    );

    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs_f32(s.max(0.0)));
    let ticker = crossbeam_channel::tick(FRAME_INTERVAL);

    for now in ticker.iter() {
        if deadline.is_some_and(|d| now >= d) {
            break;
        }
        if let Some(reading) = session.tick() {
            if let Some(fault) = &reading.error {
                error!("{fault}");
            }
            display::redraw(&render(&reading));
        }
    }

    session.stop();
    println!();
    Ok(())
}
