//! padbox CLI: live playback, offline render and pattern listing.

use clap::{crate_version, Parser, Subcommand};
use pb_ir::{NATIVE_SAMPLE_RATE, NUM_TRACKS, STEPS_PER_PATTERN};
use pb_master::{Config, Controller, NullOutput, PRESETS, TRACK_NAMES};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "A sample-based drum machine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays the configured kit through the default audio device.
    Play {
        /// The path to the YAML config.
        config: PathBuf,
        /// Stop after this many seconds. Runs until interrupted otherwise.
        #[arg(short, long)]
        seconds: Option<u64>,
        /// Discard audio instead of opening a device.
        #[arg(long)]
        null: bool,
    },
    /// Renders the sequencer output to a WAV file without real-time playback.
    Render {
        /// The path to the YAML config.
        config: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// Length of the render.
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
    },
    /// Prints the step grid of a pattern.
    Patterns {
        /// The path to the YAML config.
        config: PathBuf,
        /// Pattern slot to print. Defaults to the configured start pattern.
        #[arg(short, long)]
        pattern: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            seconds,
            null,
        } => {
            let config = Config::load(&config)?;
            let ctrl = Controller::from_config(&config)?;
            if null {
                ctrl.start_with(|rate| Ok(NullOutput::new(rate)))?;
            } else {
                ctrl.start()?;
            }
            ctrl.play();
            play_until(&ctrl, seconds.map(Duration::from_secs));
            ctrl.stop()?;
            ctrl.shutdown()?;
        }
        Commands::Render {
            config,
            output,
            seconds,
        } => {
            let config = Config::load(&config)?;
            let ctrl = Controller::from_config(&config)?;
            ctrl.play();
            let frames = seconds as usize * NATIVE_SAMPLE_RATE as usize;
            info!(path = %output.display(), seconds, "Rendering");
            let wav = ctrl.render_wav(frames)?;
            std::fs::write(&output, &wav)?;
            println!("Wrote {} bytes to {}", wav.len(), output.display());
        }
        Commands::Patterns { config, pattern } => {
            let config = Config::load(&config)?;
            let ctrl = Controller::from_config(&config)?;
            let index = pattern.unwrap_or(config.pattern);
            let Some(grid) = ctrl.pattern(index) else {
                return Err(format!("no pattern {index}").into());
            };
            match PRESETS.get(index).filter(|_| config.presets) {
                Some(preset) => println!("Pattern {index}: {}", preset.name),
                None => println!("Pattern {index}"),
            }
            for track in 0..NUM_TRACKS {
                let row: String = (0..STEPS_PER_PATTERN)
                    .map(|step| match grid.cell(track, step) {
                        Some(cell) if cell.active => 'x',
                        _ => '.',
                    })
                    .collect();
                println!("{:<10} {}", TRACK_NAMES[track], row);
            }
        }
    }

    Ok(())
}

fn play_until(ctrl: &Controller, limit: Option<Duration>) {
    let started = Instant::now();
    println!("Playing...");
    println!();

    while ctrl.is_running() && limit.map_or(true, |limit| started.elapsed() < limit) {
        let stats = ctrl.stats();
        print!(
            "\rPat: {:02} | Step: {:02} | Voices: {:02} | Load: {:5.1}%",
            ctrl.current_pattern(),
            ctrl.current_step(),
            stats.active_voices,
            stats.load_percent
        );
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(10));
    }

    println!("\rDone.{:50}", "");
}
