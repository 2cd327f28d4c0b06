//! # GCodePlay
//!
//! Toolpath interpretation and playback simulation for 3D printer and CNC
//! G-code:
//! - Streaming interpreter with arcs on any plane, workplaces, units, and belt
//!   machine shear
//! - Slicer annotation recognition (Cura, PrusaSlicer, SuperSlicer,
//!   OrcaSlicer, ideaMaker, KiriMoto)
//! - Scrub-aware playback over millions of segments
//! - Voxel simulation of additive and subtractive tools
//!
//! ## Architecture
//!
//! 1. **gcodeplay-core** - Geometry, colors, units, tools, errors
//! 2. **gcodeplay-settings** - Explicit configuration, TOML/JSON loading
//! 3. **gcodeplay-visualizer** - Interpreter, segment store, playback, voxels
//! 4. **gcodeplay** - Re-exports, logging setup, and the command-line driver

pub mod report;

pub use gcodeplay_core::{
    CancelToken, Color, Error, GeometryError, InterpretError, Plane, Position, ProgressCallback,
    Result, Tool, ToolKind, ToolRegistry, Units,
};

pub use gcodeplay_settings::{ColorMode, Config, ConfigError, SettingsError};

pub use gcodeplay_visualizer::{
    parse_str, AdvanceKind, MotionStateMachine, ParseOutput, ParseSession, PlaybackDriver,
    RevealState, Segment, SegmentStore, SlicerStyle, StepBudget, StepStatus, VoxelPlayback,
    VoxelSimulator,
};

pub use report::{CursorReport, ProgramSummary, VoxelReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr so reports on stdout stay machine-readable
/// - RUST_LOG environment variable support
/// - `verbose` raises the default level from WARN to DEBUG
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
