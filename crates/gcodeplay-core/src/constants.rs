//! Shared default values
//!
//! Single source for the defaults used by the settings crate and by the
//! interpreter when no configuration is supplied.

/// Relative slack allowed when an arc radius is slightly too small for its chord
pub const ARC_RADIUS_TOLERANCE: f64 = 1e-3;

/// Default arc interpolation segment length (mm)
pub const DEFAULT_ARC_SEGMENT_LENGTH: f64 = 1.0;

/// Depositing moves shorter than this are dropped (mm)
pub const DEFAULT_MIN_SEGMENT_LENGTH: f64 = 0.05;

/// Inches to millimetres
pub const MM_PER_INCH: f64 = 25.4;

/// Number of selectable workplaces (G54-G59, G59.1-G59.3)
pub const WORKPLACE_COUNT: usize = 9;

/// Default nozzle diameter (mm)
pub const DEFAULT_TOOL_DIAMETER: f64 = 0.4;

/// Brightness shift for the darker tool color variant
pub const DEFAULT_DARKEN_DELTA: f32 = 0.1;

/// Feed-gradient thresholds (mm/min)
pub const DEFAULT_MIN_FEED_RATE: f64 = 1200.0;
pub const DEFAULT_MAX_FEED_RATE: f64 = 3600.0;

/// Cursor jump (bytes) above which playback recomputes everything
pub const DEFAULT_SCRUB_DISTANCE: u64 = 30_000;

/// Bytes beyond the cursor that are pre-revealed
pub const DEFAULT_LOOK_AHEAD: u64 = 500;

/// Ticks a newly revealed segment or voxel stays highlighted
pub const DEFAULT_HIGHLIGHT_TICKS: u8 = 5;

/// Segments per renderer batch
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

/// Trailing lines scanned for slicer metadata
pub const METADATA_SCAN_LINES: usize = 350;

/// Leading lines scanned to detect the slicer
pub const SLICER_SNIFF_LINES: usize = 200;

/// Default belt gantry angle (degrees)
pub const DEFAULT_BELT_ANGLE_DEG: f64 = 35.0;

/// Height at which a belt machine's sheared Y equals machine Y (mm)
pub const DEFAULT_BELT_REFERENCE_HEIGHT: f64 = 0.2;

/// Default voxel cell size (mm)
pub const DEFAULT_VOXEL_WIDTH: f64 = 1.0;
pub const DEFAULT_VOXEL_HEIGHT: f64 = 1.0;
