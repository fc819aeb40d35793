//! dimscan CLI: measure the box on the table, frame by frame.

use clap::Parser;
use dimscan::io::{
    save_point_set, ArchiveMeta, FrameSource, ReplaySource, SceneBuilder, SyntheticSource,
};
use dimscan::pipeline::{ConfigError, DimsConfig};
use dimscan::{DimsResult, Frame, Pipeline, Snapshots, Stage};
use std::path::PathBuf;
use tracing::{info, warn};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "dimscan")]
#[command(about = "Estimate length, width and height of an object standing on a table")]
#[command(version)]
struct Cli {
    /// Replay the .ply files of a directory.
    #[arg(long, conflicts_with = "synthetic")]
    replay: Option<PathBuf>,

    /// Stop at the end of the replayed sequence instead of looping.
    #[arg(long)]
    no_loop: bool,

    /// Generate N synthetic frames of a box on a table.
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Seed of the synthetic scene noise.
    #[arg(long, default_value = "0")]
    scene_seed: u64,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override one parameter, e.g. --set voxel_size=0.004 (repeatable).
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,

    /// Write the effective configuration to this file and exit.
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Save this snapshot of every frame (raw, downsampled, table, object, filtered).
    #[arg(long, requires = "dump_dir")]
    dump_stage: Option<Stage>,

    /// Directory for --dump-stage output.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Stop after N frames, unreadable ones included.
    #[arg(long)]
    frames: Option<usize>,

    /// Worker threads for parallel stages.
    #[arg(long)]
    threads: Option<usize>,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(long, short)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> CliResult<DimsConfig> {
    let mut cfg = match &cli.config {
        Some(path) => DimsConfig::from_json_file(path)?,
        None => DimsConfig::default(),
    };
    for item in &cli.overrides {
        let (name, value) = item
            .split_once('=')
            .ok_or_else(|| ConfigError::Invalid(format!("expected NAME=VALUE, got {:?}", item)))?;
        cfg.set_param(name.trim(), value)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn open_source(cli: &Cli) -> CliResult<Box<dyn FrameSource>> {
    if let Some(dir) = &cli.replay {
        return Ok(Box::new(ReplaySource::open(dir, !cli.no_loop)?));
    }
    let frames = cli.synthetic.unwrap_or(1);
    Ok(Box::new(
        SyntheticSource::new(SceneBuilder::default().noise_std(0.0005), cli.scene_seed)
            .with_limit(frames),
    ))
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    dimscan::init_thread_pool(cli.threads)?;

    let cfg = load_config(&cli)?;
    if let Some(path) = &cli.save_config {
        cfg.to_json_file(path)?;
        info!(path = %path.display(), "Wrote configuration");
        return Ok(());
    }

    let pipeline = Pipeline::with_config(cfg);
    let mut source = open_source(&cli)?;
    let mut measured = 0usize;

    let on_result = |frame: &Frame, result: &DimsResult, snapshots: &Snapshots| {
        println!("{}", result);

        if let (Some(stage), Some(dir)) = (cli.dump_stage, &cli.dump_dir) {
            if let Some(cloud) = snapshots.get(stage) {
                let meta = ArchiveMeta {
                    intrinsics: frame.intrinsics,
                    timestamp_ns: frame.timestamp_ns,
                    dims: result
                        .is_valid()
                        .then_some([result.length, result.width, result.height]),
                    ..ArchiveMeta::default()
                };
                let name = format!("{}_{:06}", stage, measured);
                if let Err(e) = save_point_set(dir, &name, cloud, &meta) {
                    warn!(error = %e, "Failed to save snapshot");
                }
            }
        }
        measured += 1;
    };
    let summary = dimscan::run_frames(&mut source, &pipeline, cli.frames, on_result)?;

    info!(
        frames = summary.processed,
        unavailable = summary.unavailable,
        "Done"
    );
    Ok(())
}
