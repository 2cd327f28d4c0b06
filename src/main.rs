//! gcodeplay - interpret a G-code program and report its playback timeline

use anyhow::{Context, Result};
use clap::Parser;
use gcodeplay::{
    init_logging, Config, CursorReport, ParseSession, ProgramSummary, StepBudget, VoxelReport,
    VoxelSimulator, BUILD_DATE, VERSION,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bytes handed to the parse session per chunk
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "gcodeplay")]
#[command(version, about = "Interpret G-code and report its playback timeline", long_about = None)]
struct Cli {
    /// G-code program to interpret
    file: PathBuf,

    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override a setting, e.g. `--set parser.arc_segment_length=0.5`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Report playback state at this stream offset
    #[arg(long)]
    at: Option<u64>,

    /// Build the voxel simulation
    #[arg(long)]
    voxels: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    for entry in &cli.overrides {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("Override '{}' is not KEY=VALUE", entry))?;
        config
            .set_value(key.trim(), value)
            .with_context(|| format!("Invalid override '{}'", entry))?;
    }
    if cli.voxels {
        config.voxel.enabled = true;
    }
    Ok(config)
}

fn parse_file(path: &Path, config: &Config) -> Result<gcodeplay::ParseOutput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut session = ParseSession::new(config.clone())
        .with_expected_len(text.len() as u64)
        .with_progress(Box::new(|fraction, status| {
            debug!(progress = fraction, status, "Parse progress");
        }));

    let mut start = 0;
    while start < text.len() {
        let mut end = (start + CHUNK_SIZE).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        session.push_chunk(&text[start..end]);
        session.step(StepBudget::default())?;
        start = end;
    }
    session.finish_input();
    while !session.step(StepBudget::default())?.is_complete() {}

    Ok(session.into_output())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    info!(version = VERSION, build_date = BUILD_DATE, "gcodeplay starting");

    let config = load_config(&cli)?;
    let output = parse_file(&cli.file, &config)?;
    let mut summary = ProgramSummary::new(&output);

    let cursor = cli
        .at
        .or(output.store.max_offset())
        .unwrap_or_default();
    if cli.at.is_some() {
        summary.cursor = Some(CursorReport::new(&output, &config, cursor));
    }
    if config.voxel.enabled {
        let sim = VoxelSimulator::build_with_progress(
            &output.store,
            &output.registry,
            &config.voxel,
            &mut |fraction| {
                debug!(progress = fraction, "Voxel build progress");
                true
            },
        )?;
        summary.voxels = Some(VoxelReport::new(&sim, cursor));
    }

    if cli.json {
        println!("{}", summary.to_json()?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}
