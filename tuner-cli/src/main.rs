//! # Tuner - Terminal Front End
//!
//! Drives a [`TunerSession`] from either the default microphone or a
//! synthetic sine and prints one meter line per changed reading.
//!
//! ## Architecture
//! - **Audio thread**: CPAL callback slicing overlapping frames (see `tuner_core::audio`)
//! - **Main thread**: frame loop driven by a crossbeam `tick` channel
//! - **Logging**: `tracing` to stderr, filtered by `RUST_LOG` (default `info`)

mod display;

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tuner_core::{
    start_audio_capture, FrameSource, NoteNaming, SineSource, TunerConfig, TunerOutput,
    TunerSession,
};

/// Amplitude of the `--simulate` sine.
const SIMULATED_AMPLITUDE: f32 = 0.5;

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time instrument tuner", long_about = None)]
struct Cli {
    /// JSON config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// `auto` or the name of a configured string target (e.g. E2).
    #[arg(short, long)]
    target: Option<String>,

    /// Note names: english or solfege.
    #[arg(short, long)]
    naming: Option<NoteNaming>,

    /// Stop after this many seconds instead of running until interrupted.
    #[arg(short, long)]
    seconds: Option<f32>,

    /// Feed a synthetic sine of this frequency (Hz) instead of the microphone.
    #[arg(long, value_name = "HZ")]
    simulate: Option<f32>,

    /// Frame loop rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Print the configured targets and exit.
    #[arg(long)]
    list_targets: bool,

    /// Write the effective config to this path and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TunerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TunerConfig::default(),
    };
    if let Some(naming) = cli.naming {
        config.naming = naming;
    }
    if let Some(target) = &cli.target {
        config.target = target.clone();
    }
    config.validate().context("invalid tuner settings")?;

    if cli.list_targets {
        println!("auto");
        for t in &config.targets {
            println!("{:<5} {:>9.4} Hz", t.name, t.frequency);
        }
        return Ok(());
    }

    if let Some(path) = &cli.write_config {
        config
            .save(path)
            .with_context(|| format!("writing config to {}", path.display()))?;
        info!(path = %path.display(), "config written");
        return Ok(());
    }

    let mut session = TunerSession::from_config(&config)?;

    match cli.simulate {
        Some(frequency) => {
            info!(frequency, "simulating input");
            let mut source = SineSource::new(
                frequency,
                SIMULATED_AMPLITUDE,
                config.sample_rate,
                config.frame_size,
                config.hop_size,
            );
            run_frame_loop(&mut session, &mut source, cli.fps, cli.seconds)
        }
        None => {
            let mut capture = start_audio_capture(&config.capture_settings())
                .context("could not access the microphone; check input device permissions")?;
            let result = run_frame_loop(&mut session, &mut capture, cli.fps, cli.seconds);
            capture.stop()?;
            result
        }
    }
}

/// Polls `source` once per tick and redraws the meter when the output changes.
fn run_frame_loop<S: FrameSource>(
    session: &mut TunerSession,
    source: &mut S,
    fps: u32,
    seconds: Option<f32>,
) -> Result<()> {
    let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
    let ticker = crossbeam_channel::tick(period);
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs_f32(s.max(0.0)));

    session.start();
    let mut shown = TunerOutput::Idle;
    draw(&shown)?;

    for now in ticker.iter() {
        if deadline.is_some_and(|d| now >= d) {
            break;
        }
        if let Some(output) = session.poll(source) {
            if output != shown {
                draw(&output)?;
                shown = output;
            }
        }
    }

    draw(&session.stop())?;
    println!();
    Ok(())
}

fn draw(output: &TunerOutput) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\r{}", display::render_line(output))?;
    stdout.flush()?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
