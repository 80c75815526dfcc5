//! Multi-camera motion tracker: triangulates moving objects from synchronized frame sequences.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use multicam_tracker::{
    app::TrackerApp,
    config::{Config, EXAMPLE_CONFIG},
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Directory of frames for one camera, repeated once per camera in rig order
    #[arg(short, long = "frames")]
    frames: Vec<PathBuf>,

    /// Write JSON lines to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many frame sets
    #[arg(short, long)]
    max_frames: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_example_config: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_example_config {
        print!("{}", EXAMPLE_CONFIG);
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Multi-camera tracker");

    let config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        Config::from_file(config_path).with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        warn!("No configuration given, using the example two-camera rig");
        Config::from_yaml(EXAMPLE_CONFIG)?
    };

    if args.frames.len() != config.cameras.len() {
        bail!(
            "Configuration describes {} cameras but {} frame directories were given",
            config.cameras.len(),
            args.frames.len()
        );
    }

    let mut app = TrackerApp::from_directories(config, &args.frames)?.with_max_frames(args.max_frames);

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let summary = app.run(&mut writer)?;
    info!("Done after {} frames", summary.frames_processed);

    Ok(())
}
